/*!
# Overview
bucket-transfer copies a list of objects from their source S3 buckets into one target bucket,
verifies every copy, and keeps an audit trail of what was copied.

## Features
- Manifest driven
  The objects to copy are listed in a JSON file: `[{"id": 1, "node": {"bucket": "b", "path": "p"}}]`.
  Entries are transferred one at a time, in manifest order.

- Server-side copy
  Object data never leaves S3. Objects uploaded in a single part are copied with `CopyObject`.
  Multipart objects are copied part by part with `UploadPartCopy`, mirroring the source part layout
  so the target keeps the source ETag.

- Verified
  After each copy the source and target metadata are compared field by field.
  A different ETag, additional checksum or `Content-Type` stops the run immediately.

- Audit trail
  For every verified copy one line `{"id": <manifest id>, "node": <target metadata>}` is appended to the
  metadata output file.

- Path rewrite
  Leading path segments can be stripped per source bucket (`--strip-path-segments legacy-bucket=2`).

- Optional source deletion
  With `--delete-source`, the source object is deleted after its copy has been verified and recorded.

## As a library
bucket-transfer CLI is a thin wrapper of this library.

Example usage
=============

```Toml
[dependencies]
bucket-transfer = "0.3"
tokio = { version = "1", features = ["full"] }
```

```no_run
use bucket_transfer::config::args::parse_from_args;
use bucket_transfer::manifest::load_manifest;
use bucket_transfer::storage::s3::S3StorageFactory;
use bucket_transfer::transfer::{TransferOptions, Transferer};
use bucket_transfer::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // You can use all the arguments for bucket-transfer CLI.
    let args = vec![
        "program_name",
        "--project",
        "123456789012",
        "--json-input",
        "./manifest.json",
        "--target-bucket",
        "target-bucket",
        "--meta-outfile",
        "./meta.jsonl",
    ];

    let config = Config::try_from(parse_from_args(args)?).map_err(anyhow::Error::msg)?;

    let storage = S3StorageFactory::create(&config.client_config, &config.project).await;
    let entries = load_manifest(&config.manifest).await?;

    let transferer = Transferer::new(
        storage,
        TransferOptions::from(&config),
        tracing::info_span!("transfer"),
    );
    transferer.run(&entries).await
}
```

For more information about bucket-transfer binary, see `src/bin/bucket-transfer`.
*/

pub use config::Config;
pub use config::args::CLIArgs;

pub mod config;
pub mod manifest;
pub mod metadata;
pub mod path_rewrite;
pub mod storage;
pub mod transfer;
pub mod types;
