use crate::config::Config;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::{Client as S3Client, config::Region};
use std::sync::Arc;

pub async fn get_client(config: &Config) -> Arc<S3Client> {
    let region = Region::new("us-east-1");
    let credentials = Credentials::new(
        &config.s3_access_key,
        &config.s3_secret_key,
        None,
        None,
        "manual",
    );
    let shared_config = aws_config::defaults(BehaviorVersion::latest())
        .region(region.clone())
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_url)
        .load()
        .await;

    Arc::new(S3Client::new(&shared_config))
}

pub async fn put_object(
    client: &S3Client,
    bucket: &str,
    key: &str,
    data: Vec<u8>,
) -> Result<(), String> {
    client
        .put_object()
        .bucket(bucket)
        .key(key)
        .body(ByteStream::from(data))
        .send()
        .await
        .map(|_| ())
        .map_err(|err| format!("Failed to upload {key} to S3: {err}"))
}

pub async fn get_object(client: &S3Client, bucket: &str, key: &str) -> Result<Vec<u8>, String> {
    let response = client
        .get_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .map_err(|err| format!("Failed to fetch {key} from S3: {err}"))?;

    let bytes = response
        .body
        .collect()
        .await
        .map_err(|err| format!("Failed to read {key} from S3: {err}"))?;
    Ok(bytes.into_bytes().to_vec())
}

pub async fn delete_object(client: &S3Client, bucket: &str, key: &str) -> Result<(), String> {
    client
        .delete_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .map(|_| ())
        .map_err(|err| format!("Failed to delete {key} from S3: {err}"))
}
