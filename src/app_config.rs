use crate::error::{FountainError, Result};
use crate::fec::producer::DEFAULT_ID_SPACE;
use crate::fec::{Codec, CodecKind, Redundancy, MAX_REDUNDANCY, MAX_SOURCE_SYMBOLS};
use serde::Deserialize;
use std::path::Path;

#[derive(Clone, Debug, PartialEq)]
pub struct CodecConfig {
    pub kind: CodecKind,
    pub source_symbols: usize,
    pub redundancy: u32,
}

impl CodecConfig {
    pub fn build(&self) -> Result<Codec> {
        Codec::with_kind(self.kind, self.source_symbols, Redundancy::new(self.redundancy))
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_SOURCE_SYMBOLS).contains(&self.source_symbols) {
            return Err(FountainError::config(format!(
                "codec.source_symbols must be between 1 and {}",
                MAX_SOURCE_SYMBOLS
            )));
        }
        if !(1..=MAX_REDUNDANCY).contains(&self.redundancy) {
            return Err(FountainError::config(format!(
                "codec.redundancy must be between 1 and {}",
                MAX_REDUNDANCY
            )));
        }
        Ok(())
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            kind: CodecKind::Raptor,
            source_symbols: 45,
            redundancy: Redundancy::DEFAULT.get(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProducerConfig {
    /// Identifiers drawn per batch.
    pub blocks: usize,
    pub id_space: u64,
}

impl ProducerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.blocks < 1 {
            return Err(FountainError::config("producer.blocks must be at least 1"));
        }
        if self.id_space < 1 {
            return Err(FountainError::config("producer.id_space must be at least 1"));
        }
        Ok(())
    }
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            blocks: 20,
            id_space: DEFAULT_ID_SPACE,
        }
    }
}

/// Unified configuration structure parsed from a TOML file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppConfig {
    pub codec: CodecConfig,
    pub producer: ProducerConfig,
}

impl AppConfig {
    /// Load configuration from a TOML string. Missing sections and keys fall
    /// back to their defaults.
    pub fn from_toml(s: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct Root {
            codec: Option<CodecSection>,
            producer: Option<ProducerSection>,
        }

        #[derive(Deserialize)]
        struct CodecSection {
            kind: Option<CodecKind>,
            source_symbols: Option<usize>,
            redundancy: Option<u32>,
        }

        #[derive(Deserialize)]
        struct ProducerSection {
            blocks: Option<usize>,
            id_space: Option<u64>,
        }

        let raw: Root = toml::from_str(s)?;
        let codec_defaults = CodecConfig::default();
        let producer_defaults = ProducerConfig::default();

        let codec = match raw.codec {
            Some(c) => CodecConfig {
                kind: c.kind.unwrap_or(codec_defaults.kind),
                source_symbols: c.source_symbols.unwrap_or(codec_defaults.source_symbols),
                redundancy: c.redundancy.unwrap_or(codec_defaults.redundancy),
            },
            None => codec_defaults,
        };
        let producer = match raw.producer {
            Some(p) => ProducerConfig {
                blocks: p.blocks.unwrap_or(producer_defaults.blocks),
                id_space: p.id_space.unwrap_or(producer_defaults.id_space),
            },
            None => producer_defaults,
        };
        Ok(Self { codec, producer })
    }

    /// Load configuration from a file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Validate all sub-configurations.
    pub fn validate(&self) -> Result<()> {
        self.codec.validate()?;
        self.producer.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = AppConfig::from_toml("").unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.codec.source_symbols, 45);
        assert_eq!(cfg.producer.id_space, 60_000);
    }

    #[test]
    fn partial_sections_fill_in() {
        let cfg = AppConfig::from_toml(
            r#"
            [codec]
            kind = "lt"
            redundancy = 2
            "#,
        )
        .unwrap();
        assert_eq!(cfg.codec.kind, CodecKind::Lt);
        assert_eq!(cfg.codec.source_symbols, 45);
        assert_eq!(cfg.codec.redundancy, 2);
        assert_eq!(cfg.producer.blocks, 20);
        assert_eq!(cfg.codec.build().unwrap().kind(), CodecKind::Lt);
    }

    #[test]
    fn zero_values_fail_validation() {
        let cfg = AppConfig::from_toml("[codec]\nsource_symbols = 0\n").unwrap();
        assert!(matches!(
            cfg.validate(),
            Err(FountainError::InvalidConfiguration(_))
        ));
        let cfg = AppConfig::from_toml("[producer]\nblocks = 0\n").unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn oversized_codec_fails_validation() {
        let cfg = AppConfig::from_toml("[codec]\nsource_symbols = 70000\n").unwrap();
        assert!(matches!(
            cfg.validate(),
            Err(FountainError::InvalidConfiguration(_))
        ));
        let cfg = AppConfig::from_toml("[codec]\nredundancy = 4000000000\n").unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unknown_kind_is_a_parse_error() {
        assert!(matches!(
            AppConfig::from_toml("[codec]\nkind = \"reed-solomon\"\n"),
            Err(FountainError::Toml(_))
        ));
    }
}
