#[cfg(test)]
mod tests {
    use crate::cli::Args;
    use crate::config::{FormatMode, LlmProvider, ProductModel};
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_args_require_product() {
        assert!(Args::try_parse_from(["carousel-rs"]).is_err());
    }

    #[test]
    fn test_args_default_values() {
        let args = Args::try_parse_from(["carousel-rs", "--product", "Test Serum"]).unwrap();

        assert_eq!(args.product, "Test Serum");
        assert_eq!(args.brand, None);
        assert_eq!(args.price, None);
        assert!(args.features.is_empty());
        assert!(!args.use_gemini);
        assert!(!args.skip_text_overlay);
        assert!(!args.verbose);
    }

    #[test]
    fn test_args_short_options() {
        let args = Args::try_parse_from([
            "carousel-rs",
            "-p", "Test Serum",
            "-b", "GlowCo",
            "-o", "/test/output",
            "-v",
        ])
        .unwrap();

        assert_eq!(args.product, "Test Serum");
        assert_eq!(args.brand, Some("GlowCo".to_string()));
        assert_eq!(args.output_path, Some(PathBuf::from("/test/output")));
        assert!(args.verbose);
    }

    #[test]
    fn test_args_repeatable_features() {
        let args = Args::try_parse_from([
            "carousel-rs",
            "--product", "Test Serum",
            "--features", "vitamin C",
            "--features", "fragrance free",
        ])
        .unwrap();

        assert_eq!(args.features, vec!["vitamin C", "fragrance free"]);
    }

    #[test]
    fn test_args_llm_options() {
        let args = Args::try_parse_from([
            "carousel-rs",
            "--product", "Test Serum",
            "--llm-provider", "openai",
            "--llm-api-key", "test-key",
            "--llm-api-base-url", "https://api.openai.com",
            "--model", "gpt-4o",
            "--model-fallback", "gpt-4o-mini",
        ])
        .unwrap();

        assert_eq!(args.llm_provider, Some("openai".to_string()));
        assert_eq!(args.llm_api_key, Some("test-key".to_string()));
        assert_eq!(
            args.llm_api_base_url,
            Some("https://api.openai.com".to_string())
        );
        assert_eq!(args.model, Some("gpt-4o".to_string()));
        assert_eq!(args.model_fallback, Some("gpt-4o-mini".to_string()));
    }

    #[test]
    fn test_into_config_basic() {
        let args = Args::try_parse_from([
            "carousel-rs",
            "--product", "Test Serum",
            "--brand", "GlowCo",
            "--price", "29.99",
        ])
        .unwrap();

        let config = args.into_config().unwrap();

        assert_eq!(config.request.product, "Test Serum");
        assert_eq!(config.request.brand, "GlowCo");
        assert_eq!(config.request.price, 29.99);
        assert_eq!(config.product_model, ProductModel::Recraft);
        assert_eq!(config.format_mode, FormatMode::Cover);
        assert!(!config.use_gemini);
    }

    #[test]
    fn test_into_config_with_overrides() {
        let args = Args::try_parse_from([
            "carousel-rs",
            "--product", "Test Serum",
            "--product-image", "/photos/serum.jpg",
            "--product-model", "flux_redux",
            "--format-mode", "contain",
            "--use-gemini",
            "--skip-text-overlay",
            "--llm-provider", "openrouter",
        ])
        .unwrap();

        let config = args.into_config().unwrap();

        assert_eq!(
            config.request.product_image,
            Some(PathBuf::from("/photos/serum.jpg"))
        );
        assert_eq!(config.product_model, ProductModel::FluxRedux);
        assert_eq!(config.format_mode, FormatMode::Contain);
        assert!(config.use_gemini);
        assert!(config.skip_text_overlay);
        assert_eq!(config.llm.provider, LlmProvider::OpenRouter);
    }

    #[test]
    fn test_into_config_unknown_enum_keeps_default() {
        let args = Args::try_parse_from([
            "carousel-rs",
            "--product", "Test Serum",
            "--product-model", "midjourney",
            "--format-mode", "tile",
        ])
        .unwrap();

        let config = args.into_config().unwrap();

        assert_eq!(config.product_model, ProductModel::Recraft);
        assert_eq!(config.format_mode, FormatMode::Cover);
    }

    #[test]
    fn test_into_config_missing_config_file_is_error() {
        let args = Args::try_parse_from([
            "carousel-rs",
            "--product", "Test Serum",
            "--config", "/definitely/not/here.toml",
        ])
        .unwrap();

        assert!(args.into_config().is_err());
    }
}
