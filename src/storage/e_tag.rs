use aws_sdk_s3::types::ServerSideEncryption;

use crate::types::ObjectHandle;

/// A `-` in an ETag means the object was assembled by a multipart upload.
pub fn is_multipart_upload_e_tag(e_tag: &Option<String>) -> bool {
    e_tag.as_ref().is_some_and(|e_tag| e_tag.contains('-'))
}

/// Number of parts encoded in a multipart ETag (`"<md5>-<parts>"`).
pub fn parts_count_from_e_tag(e_tag: &Option<String>) -> Option<i32> {
    let normalized = normalize_e_tag(e_tag)?;
    let (_, parts_count) = normalized.rsplit_once('-')?;

    parts_count.parse::<i32>().ok().filter(|count| 0 < *count)
}

pub fn normalize_e_tag(e_tag: &Option<String>) -> Option<String> {
    e_tag
        .as_ref()
        .map(|e_tag| e_tag.trim_matches('"').to_string())
}

/// Whether the ETags of `source` and `target` are both content hashes.
///
/// S3 derives the ETag from the content only for unencrypted and SSE-S3 objects.
/// SSE-KMS, DSSE-KMS and SSE-C objects get an ETag that changes with every copy.
pub fn is_e_tag_verifiable(source: &ObjectHandle, target: &ObjectHandle) -> bool {
    [source, target].iter().all(|handle| {
        handle.sse_customer_algorithm.is_none()
            && is_verification_supported_sse(&handle.server_side_encryption)
    })
}

fn is_verification_supported_sse(sse: &Option<String>) -> bool {
    sse.as_deref()
        .is_none_or(|sse| sse == ServerSideEncryption::Aes256.as_str())
}
