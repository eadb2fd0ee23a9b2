//! S3 storage service
//!
//! Wraps aws-sdk-s3 and implements the `StorageService` trait from snap-core.
//! SDK-level retries are disabled: the blob store decides what to retry, so
//! every call here is exactly one round trip.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::delete_objects::DeleteObjectsOutput;
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Output;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use bytes::Bytes;

use snap_core::{
    Alias, BatchTracker, BlobStream, BucketInfo, Error, ListRequest, ListingPage, RemoteObject,
    Result, StorageService,
};

use crate::multipart::{self, MultipartConfig};

/// S3-backed storage service
pub struct S3Service {
    inner: aws_sdk_s3::Client,
    multipart: MultipartConfig,
}

impl S3Service {
    /// Create a new service from an alias configuration
    pub async fn new(alias: &Alias) -> Result<Self> {
        let credentials = aws_credential_types::Credentials::new(
            alias.access_key.clone(),
            alias.secret_key.clone(),
            None, // session token
            None, // expiry
            "snap-static-credentials",
        );

        let timeout = alias.timeout_config();
        let timeouts = aws_config::timeout::TimeoutConfig::builder()
            .connect_timeout(Duration::from_millis(timeout.connect_ms))
            .read_timeout(Duration::from_millis(timeout.read_ms))
            .build();

        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(alias.region.clone()))
            .endpoint_url(&alias.endpoint)
            .timeout_config(timeouts)
            .retry_config(aws_smithy_types::retry::RetryConfig::disabled())
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(alias.path_style())
            .build();

        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
            multipart: MultipartConfig::default(),
        })
    }

    /// Get the underlying aws-sdk-s3 client
    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.inner
    }

    async fn put_single(
        &self,
        bucket: &str,
        name: &str,
        content: Bytes,
        length: u64,
    ) -> Result<()> {
        self.inner
            .put_object()
            .bucket(bucket)
            .key(name)
            .content_length(length as i64)
            .body(ByteStream::from(content))
            .send()
            .await
            .map_err(|e| classify(e, &format!("PutObject [{name}]")))?;
        Ok(())
    }
}

#[async_trait]
impl StorageService for S3Service {
    async fn get_bucket(&self, bucket: &str) -> Result<BucketInfo> {
        let response = self
            .inner
            .head_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| classify(e, &format!("HeadBucket [{bucket}]")))?;

        let id = match response.bucket_region() {
            Some(region) => format!("{region}:{bucket}"),
            None => bucket.to_string(),
        };
        Ok(BucketInfo {
            id,
            name: bucket.to_string(),
        })
    }

    async fn get_object(&self, bucket: &str, name: &str) -> Result<RemoteObject> {
        let response = self
            .inner
            .head_object()
            .bucket(bucket)
            .key(name)
            .send()
            .await
            .map_err(|e| classify(e, &format!("HeadObject [{name}]")))?;

        let etag = response.e_tag().map(trim_etag);
        Ok(RemoteObject {
            id: Some(object_id(etag.as_deref(), name)),
            name: name.to_string(),
            size: response.content_length(),
            etag,
            updated: response.last_modified().and_then(to_timestamp),
        })
    }

    async fn get_object_media(&self, bucket: &str, name: &str) -> Result<BlobStream> {
        let response = self
            .inner
            .get_object()
            .bucket(bucket)
            .key(name)
            .send()
            .await
            .map_err(|e| classify(e, &format!("GetObject [{name}]")))?;

        Ok(Box::pin(response.body.into_async_read()))
    }

    async fn insert_object(
        &self,
        bucket: &str,
        name: &str,
        content: Bytes,
        length: u64,
    ) -> Result<()> {
        if content.len() as u64 != length {
            return Err(Error::General(format!(
                "declared length {length} does not match {} bytes of content for [{name}]",
                content.len()
            )));
        }

        if length < self.multipart.threshold {
            self.put_single(bucket, name, content, length).await
        } else {
            multipart::upload(&self.inner, &self.multipart, bucket, name, content).await
        }
    }

    async fn delete_object(&self, bucket: &str, name: &str) -> Result<()> {
        self.inner
            .delete_object()
            .bucket(bucket)
            .key(name)
            .send()
            .await
            .map_err(|e| classify(e, &format!("DeleteObject [{name}]")))?;
        Ok(())
    }

    async fn delete_batch(
        &self,
        bucket: &str,
        names: &[String],
        tracker: &BatchTracker,
    ) -> Result<()> {
        let objects = names
            .iter()
            .map(|name| ObjectIdentifier::builder().key(name).build())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::General(e.to_string()))?;

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(false)
            .build()
            .map_err(|e| Error::General(e.to_string()))?;

        let response = self
            .inner
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| classify(e, &format!("DeleteObjects [{} keys]", names.len())))?;

        report_deleted(&response, tracker);
        Ok(())
    }

    async fn rewrite_object(&self, bucket: &str, source: &str, target: &str) -> Result<()> {
        self.inner
            .copy_object()
            .copy_source(format!("{bucket}/{source}"))
            .bucket(bucket)
            .key(target)
            .send()
            .await
            .map_err(|e| classify(e, &format!("CopyObject [{source}] to [{target}]")))?;
        Ok(())
    }

    async fn list_objects(&self, bucket: &str, request: ListRequest) -> Result<ListingPage> {
        let max_keys = i32::try_from(request.page_size).unwrap_or(i32::MAX);
        let response = self
            .inner
            .list_objects_v2()
            .bucket(bucket)
            .max_keys(max_keys)
            .set_prefix(request.prefix)
            .set_continuation_token(request.page_token)
            .send()
            .await
            .map_err(|e| classify(e, &format!("ListObjectsV2 [{bucket}]")))?;

        let items = response
            .contents()
            .iter()
            .map(|object| {
                let etag = object.e_tag().map(trim_etag);
                let name = object.key().unwrap_or_default().to_string();
                RemoteObject {
                    id: Some(object_id(etag.as_deref(), &name)),
                    name,
                    size: object.size(),
                    etag,
                    updated: object.last_modified().and_then(to_timestamp),
                }
            })
            .collect();

        Ok(ListingPage {
            items,
            next_page_token: next_token(&response),
        })
    }
}

/// Map an SDK failure onto the store's error kinds
pub(crate) fn classify<E>(err: SdkError<E, HttpResponse>, context: &str) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let message = format!("{context}: {}", DisplayErrorContext(&err));
    match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            Error::Network(message)
        }
        _ => {
            let status = err.raw_response().map(|response| response.status().as_u16());
            let code = err.as_service_error().and_then(ProvideErrorMetadata::code);
            error_for(status, code, message)
        }
    }
}

fn error_for(status: Option<u16>, code: Option<&str>, message: String) -> Error {
    match (status, code) {
        (_, Some("NoSuchKey" | "NoSuchBucket" | "NotFound")) | (Some(404), _) => {
            Error::NotFound(message)
        }
        (_, Some("NoSuchUpload")) | (Some(410), _) => Error::SessionExpired(message),
        (_, Some("AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch"))
        | (Some(401 | 403), _) => Error::Auth(message),
        (_, Some("SlowDown" | "RequestTimeout" | "InternalError" | "ServiceUnavailable"))
        | (Some(408 | 429 | 500..=599), _) => Error::Network(message),
        _ => Error::General(message),
    }
}

/// Feed per-key outcomes of a DeleteObjects response to the tracker
fn report_deleted(response: &DeleteObjectsOutput, tracker: &BatchTracker) {
    for deleted in response.deleted() {
        if let Some(key) = deleted.key() {
            tracker.on_success(key);
        }
    }

    for failed in response.errors() {
        let reason = failed
            .message()
            .or(failed.code())
            .unwrap_or("unknown error");
        tracker.on_failure(failed.key().unwrap_or_default(), reason);
    }
}

/// Continuation token, only when the listing says more pages follow
fn next_token(response: &ListObjectsV2Output) -> Option<String> {
    if response.is_truncated().unwrap_or(false) {
        response.next_continuation_token().map(str::to_string)
    } else {
        None
    }
}

/// Blob id: the ETag, or the key for services that omit it
fn object_id(etag: Option<&str>, name: &str) -> String {
    etag.unwrap_or(name).to_string()
}

fn trim_etag(etag: &str) -> String {
    etag.trim_matches('"').to_string()
}

fn to_timestamp(time: &aws_smithy_types::DateTime) -> Option<jiff::Timestamp> {
    jiff::Timestamp::new(time.secs(), time.subsec_nanos() as i32).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::operation::head_object::HeadObjectError;
    use aws_sdk_s3::types::{DeletedObject, Error as S3Error};
    use aws_smithy_types::body::SdkBody;

    fn kind(err: &Error) -> &'static str {
        match err {
            Error::NotFound(_) => "not_found",
            Error::SessionExpired(_) => "session_expired",
            Error::Auth(_) => "auth",
            Error::Network(_) => "network",
            Error::General(_) => "general",
            _ => "other",
        }
    }

    #[test]
    fn test_error_for_status_codes() {
        assert_eq!(kind(&error_for(Some(404), None, String::new())), "not_found");
        assert_eq!(kind(&error_for(Some(410), None, String::new())), "session_expired");
        assert_eq!(kind(&error_for(Some(403), None, String::new())), "auth");
        assert_eq!(kind(&error_for(Some(503), None, String::new())), "network");
        assert_eq!(kind(&error_for(Some(429), None, String::new())), "network");
        assert_eq!(kind(&error_for(Some(400), None, String::new())), "general");
        assert_eq!(kind(&error_for(None, None, String::new())), "general");
    }

    #[test]
    fn test_error_for_error_codes() {
        assert_eq!(
            kind(&error_for(Some(400), Some("NoSuchUpload"), String::new())),
            "session_expired"
        );
        assert_eq!(
            kind(&error_for(Some(400), Some("NoSuchBucket"), String::new())),
            "not_found"
        );
        assert_eq!(
            kind(&error_for(Some(400), Some("SlowDown"), String::new())),
            "network"
        );
    }

    #[test]
    fn test_classify_head_not_found() {
        let response = HttpResponse::new(404u16.try_into().unwrap(), SdkBody::empty());
        let err = SdkError::service_error(
            HeadObjectError::NotFound(aws_sdk_s3::types::error::NotFound::builder().build()),
            response,
        );

        let classified = classify(err, "HeadObject [a]");
        assert!(classified.is_not_found());
        assert!(classified.to_string().contains("HeadObject [a]"));
    }

    #[test]
    fn test_classify_timeout_is_network() {
        let err: SdkError<HeadObjectError, HttpResponse> = SdkError::timeout_error("slow");
        assert!(matches!(classify(err, "HeadObject [a]"), Error::Network(_)));
    }

    #[test]
    fn test_to_timestamp() {
        let time = aws_smithy_types::DateTime::from_secs_and_nanos(1_700_000_000, 500);
        let ts = to_timestamp(&time).unwrap();
        assert_eq!(ts.as_second(), 1_700_000_000);
        assert_eq!(ts.subsec_nanosecond(), 500);
    }

    #[test]
    fn test_object_id_falls_back_to_key() {
        assert_eq!(object_id(Some("abc"), "snap-1"), "abc");
        assert_eq!(object_id(None, "snap-1"), "snap-1");
    }

    #[test]
    fn test_report_deleted_counts_only_deleted_keys() {
        let response = DeleteObjectsOutput::builder()
            .deleted(DeletedObject::builder().key("a").build())
            .deleted(DeletedObject::builder().key("c").build())
            .deleted(DeletedObject::builder().build())
            .errors(
                S3Error::builder()
                    .key("b")
                    .code("AccessDenied")
                    .message("Access Denied")
                    .build(),
            )
            .build();

        let tracker = BatchTracker::new("snapshots", 3);
        report_deleted(&response, &tracker);
        assert!(!tracker.is_complete());
        assert_eq!(tracker.outstanding(), 1);

        let response = DeleteObjectsOutput::builder()
            .deleted(DeletedObject::builder().key("b").build())
            .build();
        report_deleted(&response, &tracker);
        assert!(tracker.is_complete());
    }

    #[test]
    fn test_report_deleted_empty_response_leaves_batch_open() {
        let tracker = BatchTracker::new("snapshots", 2);
        report_deleted(&DeleteObjectsOutput::builder().build(), &tracker);
        assert_eq!(tracker.outstanding(), 2);
    }

    #[test]
    fn test_next_token_requires_truncation() {
        let more = ListObjectsV2Output::builder()
            .is_truncated(true)
            .next_continuation_token("t1")
            .build();
        assert_eq!(next_token(&more), Some("t1".to_string()));

        let last = ListObjectsV2Output::builder()
            .is_truncated(false)
            .next_continuation_token("stale")
            .build();
        assert_eq!(next_token(&last), None);

        let unset = ListObjectsV2Output::builder()
            .next_continuation_token("stale")
            .build();
        assert_eq!(next_token(&unset), None);

        let no_token = ListObjectsV2Output::builder().is_truncated(true).build();
        assert_eq!(next_token(&no_token), None);
    }

    #[test]
    fn test_trim_etag() {
        assert_eq!(trim_etag("\"abc\""), "abc");
        assert_eq!(trim_etag("abc"), "abc");
    }

    #[tokio::test]
    async fn test_service_builds_from_alias() {
        let alias = Alias::new("local", "http://localhost:9000", "access", "secret");
        let service = S3Service::new(&alias).await.unwrap();
        assert_eq!(
            service.inner().config().region().map(|r| r.to_string()),
            Some("us-east-1".to_string())
        );
    }
}
