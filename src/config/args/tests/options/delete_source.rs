#[cfg(test)]
mod tests {
    use crate::config::args::*;

    const REQUIRED_ARGS: [&str; 9] = [
        "bucket-transfer",
        "--project",
        "123456789012",
        "--json-input",
        "./test_data/manifest.json",
        "--target-bucket",
        "target-bucket",
        "--meta-outfile",
        "./test_data/out/meta.jsonl",
    ];

    #[test]
    fn with_default_value() {
        init_dummy_tracing_subscriber();

        let config = build_config_from_args(REQUIRED_ARGS.to_vec()).unwrap();

        assert!(!config.delete_source);
    }

    #[test]
    fn with_short_option() {
        init_dummy_tracing_subscriber();

        let mut args = REQUIRED_ARGS.to_vec();
        args.push("-d");

        let config = build_config_from_args(args).unwrap();

        assert!(config.delete_source);
    }

    #[test]
    fn with_long_option() {
        init_dummy_tracing_subscriber();

        let mut args = REQUIRED_ARGS.to_vec();
        args.push("--delete-source");

        let config = build_config_from_args(args).unwrap();

        assert!(config.delete_source);
    }

    fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }
}
