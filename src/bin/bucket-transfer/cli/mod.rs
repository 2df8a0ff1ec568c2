use anyhow::Result;
use tokio::time::Instant;
use tracing::{error, info_span, trace};

use bucket_transfer::Config;
use bucket_transfer::manifest::load_manifest;
use bucket_transfer::storage::s3::S3StorageFactory;
use bucket_transfer::transfer::{TransferOptions, Transferer};
use bucket_transfer::types::error::TransferError;

#[allow(dead_code)]
const EXIT_CODE_SUCCESS: i32 = 0;
const EXIT_CODE_ERROR: i32 = 1;
const EXIT_CODE_INVALID_ARGS: i32 = 2;
const EXIT_CODE_INTEGRITY_ERROR: i32 = 4;

pub async fn run(config: Config) -> Result<()> {
    let start_time = Instant::now();
    trace!("transfer start.");

    let result = transfer(&config).await;

    let duration_sec = format!("{:.3}", start_time.elapsed().as_secs_f32());
    if let Err(e) = &result {
        let error = format!("{e:#}");
        error!(
            error = error,
            duration_sec = duration_sec,
            "bucket-transfer failed."
        );
        return result;
    }

    trace!(
        duration_sec = duration_sec,
        "bucket-transfer has been completed."
    );

    Ok(())
}

async fn transfer(config: &Config) -> Result<()> {
    let entries = load_manifest(&config.manifest).await?;
    let storage = S3StorageFactory::create(&config.client_config, &config.project).await;

    let span = info_span!(
        "transfer",
        project = config.project,
        target_bucket = config.target_bucket
    );

    Transferer::new(storage, TransferOptions::from(config), span)
        .run(&entries)
        .await
}

pub fn exit_code(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<TransferError>() {
        Some(TransferError::Configuration(_)) => EXIT_CODE_INVALID_ARGS,
        Some(TransferError::Integrity { .. }) => EXIT_CODE_INTEGRITY_ERROR,
        _ => EXIT_CODE_ERROR,
    }
}
