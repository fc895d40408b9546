use kvb_marshal::MarshalFormat;
use serde::{Deserialize, Serialize};

/// Construction-time options shared by every store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Format used for every record this store writes and reads.
    /// Defaults to [`MarshalFormat::Json`].
    pub marshal_format: MarshalFormat,
}

impl StoreOptions {
    /// Options selecting `format`.
    pub fn with_format(format: MarshalFormat) -> Self {
        Self {
            marshal_format: format,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_json() {
        assert_eq!(StoreOptions::default().marshal_format, MarshalFormat::Json);
    }

    #[test]
    fn deserialize_with_and_without_format() {
        let opts: StoreOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts, StoreOptions::default());

        let opts: StoreOptions =
            serde_json::from_str(r#"{"marshal_format":"bincode"}"#).unwrap();
        assert_eq!(opts.marshal_format, MarshalFormat::Bincode);

        assert!(serde_json::from_str::<StoreOptions>(r#"{"marshal_format":"gob"}"#).is_err());
    }
}
