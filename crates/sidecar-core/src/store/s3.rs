//! S3 backend built on aws-sdk-s3.
//!
//! The activity is synchronous, so the store owns a current-thread tokio
//! runtime and blocks on each request.

use super::ObjectStore;
use crate::config::S3Config;
use crate::temp_file::PartFile;
use anyhow::{Context, Result};
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::path::Path;
use tokio::runtime::Runtime;

pub struct S3Store {
    client: Client,
    runtime: Runtime,
}

impl S3Store {
    /// Build a client from the standard AWS provider chain plus `cfg` overrides.
    pub fn connect(cfg: &S3Config) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to start S3 runtime")?;

        let client = runtime.block_on(async {
            let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
            if let Some(region) = &cfg.region {
                loader = loader.region(Region::new(region.clone()));
            }
            if let Some(endpoint) = &cfg.endpoint_url {
                loader = loader.endpoint_url(endpoint);
            }
            let aws_config = loader.load().await;

            let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
                .force_path_style(cfg.force_path_style)
                .build();
            Client::from_conf(s3_config)
        });

        tracing::debug!(
            region = cfg.region.as_deref().unwrap_or("<default>"),
            endpoint = cfg.endpoint_url.as_deref().unwrap_or("<default>"),
            "S3 client configured"
        );
        Ok(Self { client, runtime })
    }
}

impl ObjectStore for S3Store {
    fn get_to_file(&self, bucket: &str, key: &str, dest: &Path) -> Result<u64> {
        self.runtime.block_on(async {
            let resp = self
                .client
                .get_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .with_context(|| format!("GetObject s3://{}/{}", bucket, key))?;

            let mut body = resp.body;
            let mut part = PartFile::create(dest)?;
            while let Some(chunk) = body
                .try_next()
                .await
                .with_context(|| format!("read body of s3://{}/{}", bucket, key))?
            {
                part.append(&chunk)?;
            }
            let written = part.written();
            part.finalize(dest)?;
            Ok(written)
        })
    }

    fn put_from_file(&self, src: &Path, bucket: &str, key: &str) -> Result<()> {
        self.runtime.block_on(async {
            let body = ByteStream::from_path(src)
                .await
                .with_context(|| format!("open {}", src.display()))?;
            self.client
                .put_object()
                .bucket(bucket)
                .key(key)
                .body(body)
                .send()
                .await
                .with_context(|| format!("PutObject s3://{}/{}", bucket, key))?;
            Ok(())
        })
    }
}
