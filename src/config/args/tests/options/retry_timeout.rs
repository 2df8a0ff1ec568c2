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

        assert_eq!(config.client_config.retry_config.aws_max_attempts, 10);
        assert_eq!(
            config
                .client_config
                .retry_config
                .initial_backoff_milliseconds,
            100
        );

        let timeout_config = &config.client_config.cli_timeout_config;
        assert!(timeout_config.operation_timeout_milliseconds.is_none());
        assert!(
            timeout_config
                .operation_attempt_timeout_milliseconds
                .is_none()
        );
        assert!(timeout_config.connect_timeout_milliseconds.is_none());
        assert!(timeout_config.read_timeout_milliseconds.is_none());
    }

    #[test]
    fn with_custom_value() {
        init_dummy_tracing_subscriber();

        let mut args = REQUIRED_ARGS.to_vec();
        args.extend([
            "--aws-max-attempts",
            "3",
            "--initial-backoff-milliseconds",
            "500",
            "--operation-timeout-milliseconds",
            "60000",
            "--operation-attempt-timeout-milliseconds",
            "30000",
            "--connect-timeout-milliseconds",
            "5000",
            "--read-timeout-milliseconds",
            "10000",
        ]);

        let config = build_config_from_args(args).unwrap();

        assert_eq!(config.client_config.retry_config.aws_max_attempts, 3);
        assert_eq!(
            config
                .client_config
                .retry_config
                .initial_backoff_milliseconds,
            500
        );

        let timeout_config = &config.client_config.cli_timeout_config;
        assert_eq!(timeout_config.operation_timeout_milliseconds, Some(60000));
        assert_eq!(
            timeout_config.operation_attempt_timeout_milliseconds,
            Some(30000)
        );
        assert_eq!(timeout_config.connect_timeout_milliseconds, Some(5000));
        assert_eq!(timeout_config.read_timeout_milliseconds, Some(10000));
    }

    #[test]
    fn with_invalid_value() {
        init_dummy_tracing_subscriber();

        let mut args = REQUIRED_ARGS.to_vec();
        args.extend(["--aws-max-attempts", "-1"]);

        assert!(build_config_from_args(args).is_err());
    }

    fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }
}
