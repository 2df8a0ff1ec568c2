const INVALID_FORMAT: &str = "strip path segments must be in the form of BUCKET=N. e.g. legacy-bucket=2";
const EMPTY_BUCKET: &str = "bucket name must not be empty";
const INVALID_COUNT: &str = "number of segments must be a positive integer";

pub fn check_strip_path_segments(value: &str) -> Result<String, String> {
    parse_strip_path_segments(value)?;

    Ok(value.to_string())
}

pub fn parse_strip_path_segments(value: &str) -> Result<(String, usize), String> {
    let (bucket, count) = value
        .rsplit_once('=')
        .ok_or_else(|| INVALID_FORMAT.to_string())?;

    let bucket = bucket.trim();
    if bucket.is_empty() {
        return Err(EMPTY_BUCKET.to_string());
    }

    let count = count
        .trim()
        .parse::<usize>()
        .map_err(|_| INVALID_COUNT.to_string())?;
    if count == 0 {
        return Err(INVALID_COUNT.to_string());
    }

    Ok((bucket.to_string(), count))
}
