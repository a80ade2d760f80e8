use malkhana::storage::{
    MockStorageService, S3StorageClient, StorageService, photo_key, sanitize_key,
};
use uuid::Uuid;

#[cfg(test)]
mod mock_tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_success() {
        let mock = MockStorageService::new();
        let key = "property-photos/abc123/one.jpg";
        let url = mock.get_presigned_upload_url(key, "image/jpeg").await.unwrap();

        assert!(url.contains("signature=fake"));
        assert!(url.contains(key));
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let mock = MockStorageService::new_failing();
        let result = mock.get_presigned_upload_url("a.jpg", "image/jpeg").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_mock_sanitization() {
        let mock = MockStorageService::new();
        let url = mock
            .get_presigned_upload_url("../../etc/passwd", "image/png")
            .await
            .unwrap();
        assert!(!url.contains(".."));
    }
}

#[cfg(test)]
mod key_tests {
    use super::*;

    #[test]
    fn test_photo_key_layout() {
        let unique = Uuid::new_v4();
        assert_eq!(
            photo_key("abc123", "Seized Phone.JPG", unique),
            format!("property-photos/abc123/{unique}.jpg")
        );
    }

    #[test]
    fn test_photo_key_drops_unusable_extensions() {
        let unique = Uuid::new_v4();
        for filename in ["noext", "weird.j%g", "trailing.", ""] {
            assert_eq!(
                photo_key("abc123", filename, unique),
                format!("property-photos/abc123/{unique}.bin"),
                "filename {filename:?}"
            );
        }
    }

    #[test]
    fn test_photo_key_cannot_escape_prefix() {
        let key = photo_key("../other", "x.png", Uuid::new_v4());
        assert!(key.starts_with("property-photos/other/"));
        assert!(!key.contains(".."));
    }

    #[test]
    fn test_sanitize_key() {
        assert_eq!(sanitize_key("a//b/./c/../d"), "a/b/c/d");
        assert_eq!(sanitize_key("/leading"), "leading");
    }
}

#[cfg(test)]
mod s3_tests {
    use super::*;

    #[tokio::test]
    async fn test_s3_presigned_url_is_generated_offline() {
        let client = S3StorageClient::new(
            "http://localhost:9000",
            "us-east-1",
            "testkey",
            "testsecret",
            "testbucket",
        )
        .await;

        let url = client
            .get_presigned_upload_url("property-photos/abc123/one.jpg", "image/jpeg")
            .await
            .unwrap();
        assert!(url.starts_with("http://localhost:9000/testbucket/property-photos/abc123/one.jpg"));
        assert!(url.contains("X-Amz-Signature"));
    }
}
