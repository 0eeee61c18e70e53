use std::fs::File;
use std::io;
use std::path::PathBuf;

use chrono::DateTime;
use uuid::Uuid;

use crate::errors::ConversionError;
use crate::model::{BinaryValue, PropertyKind};
use crate::value::{NativeValue, ValueConverter};

/// Inline/spill decision point for binary payloads: payloads of this size or
/// larger are written to an external file instead of round-tripping as a
/// `data:` URI. 20 KiB.
pub const DATA_URI_SIZE_THRESHOLD: u64 = 20 * 1024;

/// Default converter targeting [`NativeValue`].
///
/// Scalar conversions follow the type table: STRING passes through, BOOLEAN
/// is `"true"`/`"false"`, LONG a decimal integer, DOUBLE a decimal float,
/// DECIMAL a validated arbitrary-precision decimal string, DATE an ISO-8601
/// (RFC 3339) timestamp. Binary payloads below the size threshold stay
/// inline; larger ones spill to a generated file in the spool directory
/// (the platform temp directory unless configured).
#[derive(Debug, Clone)]
pub struct DefaultValueConverter {
    data_uri_size_threshold: u64,
    spool_dir: Option<PathBuf>,
}

impl Default for DefaultValueConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultValueConverter {
    pub fn new() -> Self {
        Self {
            data_uri_size_threshold: DATA_URI_SIZE_THRESHOLD,
            spool_dir: None,
        }
    }

    /// Override the inline/spill size threshold.
    #[must_use]
    pub fn with_data_uri_size_threshold(mut self, threshold: u64) -> Self {
        self.data_uri_size_threshold = threshold;
        self
    }

    /// Directory spilled binaries are written to.
    #[must_use]
    pub fn with_spool_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spool_dir = Some(dir.into());
        self
    }

    pub fn data_uri_size_threshold(&self) -> u64 {
        self.data_uri_size_threshold
    }

    fn spill(&self, payload: &BinaryValue) -> io::Result<BinaryValue> {
        let dir = self
            .spool_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        std::fs::create_dir_all(&dir)?;

        let path = dir.join(format!(
            "treebind-{}.{}",
            Uuid::new_v4(),
            extension_for(payload.media_type())
        ));

        // Scoped acquisition: both handles close on every exit path.
        {
            let mut reader = payload.reader()?;
            let mut file = File::create(&path)?;
            io::copy(&mut reader, &mut file)?;
        }

        let mut spilled = BinaryValue::from_file(path);
        if let Some(media_type) = payload.media_type() {
            spilled = spilled.with_media_type(media_type);
        }
        if let Some(charset) = payload.charset() {
            spilled = spilled.with_charset(charset);
        }
        Ok(spilled)
    }
}

/// File extension inferred from a media type subtype; `bin` when unknown.
fn extension_for(media_type: Option<&str>) -> String {
    let ext: String = media_type
        .and_then(|mt| mt.split('/').nth(1))
        .map(|subtype| {
            subtype
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric())
                .collect()
        })
        .unwrap_or_default();

    if ext.is_empty() {
        "bin".to_string()
    } else {
        ext
    }
}

/// Validate an arbitrary-precision decimal string: optional sign, digits
/// with at most one point, optional exponent. At least one digit required.
fn is_valid_decimal(value: &str) -> bool {
    let (mantissa, exponent) = match value.find(['e', 'E']) {
        Some(pos) => (&value[..pos], Some(&value[pos + 1..])),
        None => (value, None),
    };

    let mantissa = mantissa
        .strip_prefix(['+', '-'])
        .unwrap_or(mantissa);
    let mut digits = 0usize;
    let mut seen_point = false;
    for c in mantissa.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' if !seen_point => seen_point = true,
            _ => return false,
        }
    }
    if digits == 0 {
        return false;
    }

    match exponent {
        None => true,
        Some(exp) => {
            let exp = exp.strip_prefix(['+', '-']).unwrap_or(exp);
            !exp.is_empty() && exp.chars().all(|c| c.is_ascii_digit())
        }
    }
}

impl ValueConverter for DefaultValueConverter {
    type Value = NativeValue;

    fn to_native(&self, kind: PropertyKind, value: &str) -> Result<NativeValue, ConversionError> {
        match kind {
            PropertyKind::String => Ok(NativeValue::String(value.to_string())),
            PropertyKind::Boolean => match value {
                "true" => Ok(NativeValue::Boolean(true)),
                "false" => Ok(NativeValue::Boolean(false)),
                _ => Err(ConversionError::InvalidBoolean {
                    value: value.to_string(),
                }),
            },
            PropertyKind::Long => value
                .parse::<i64>()
                .map(NativeValue::Long)
                .map_err(|_| ConversionError::InvalidLong {
                    value: value.to_string(),
                }),
            PropertyKind::Double => value
                .parse::<f64>()
                .map(NativeValue::Double)
                .map_err(|_| ConversionError::InvalidDouble {
                    value: value.to_string(),
                }),
            PropertyKind::Decimal => {
                if is_valid_decimal(value) {
                    Ok(NativeValue::Decimal(value.to_string()))
                } else {
                    Err(ConversionError::InvalidDecimal {
                        value: value.to_string(),
                    })
                }
            }
            PropertyKind::Date => DateTime::parse_from_rfc3339(value)
                .map(NativeValue::Date)
                .map_err(|e| ConversionError::InvalidDate {
                    value: value.to_string(),
                    reason: e.to_string(),
                }),
            // BINARY goes through the payload path; PATH is resolved by the
            // binder against the store; UNDEFINED carries no target type.
            PropertyKind::Binary | PropertyKind::Path | PropertyKind::Undefined => {
                Err(ConversionError::Unsupported { kind })
            }
        }
    }

    fn binary_to_native(&self, payload: &BinaryValue) -> Result<NativeValue, ConversionError> {
        // Materialize the payload through a transient reader; external
        // backings are read fully so the native value owns its bytes.
        let bytes = payload.bytes()?;
        let mut inline = BinaryValue::from_bytes(bytes);
        if let Some(media_type) = payload.media_type() {
            inline = inline.with_media_type(media_type);
        }
        if let Some(charset) = payload.charset() {
            inline = inline.with_charset(charset);
        }
        Ok(NativeValue::Binary(inline))
    }

    fn to_text(&self, value: &NativeValue) -> Result<String, ConversionError> {
        match value {
            NativeValue::String(s) => Ok(s.clone()),
            NativeValue::Boolean(b) => Ok(b.to_string()),
            NativeValue::Long(n) => Ok(n.to_string()),
            NativeValue::Double(d) => Ok(d.to_string()),
            NativeValue::Decimal(d) => Ok(d.clone()),
            NativeValue::Date(dt) => Ok(dt.to_rfc3339()),
            NativeValue::Reference(path) => Ok(path.clone()),
            NativeValue::Binary(_) => Ok(self.to_binary_payload(value)?.to_uri_string()),
        }
    }

    fn to_binary_payload(&self, value: &NativeValue) -> Result<BinaryValue, ConversionError> {
        let payload = match value {
            NativeValue::Binary(payload) => payload,
            other => {
                return Err(ConversionError::Unsupported { kind: other.kind() });
            }
        };

        if payload.len()? < self.data_uri_size_threshold {
            let mut inline = BinaryValue::from_bytes(payload.bytes()?);
            if let Some(media_type) = payload.media_type() {
                inline = inline.with_media_type(media_type);
            }
            if let Some(charset) = payload.charset() {
                inline = inline.with_charset(charset);
            }
            Ok(inline)
        } else {
            Ok(self.spill(payload)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn converter() -> DefaultValueConverter {
        DefaultValueConverter::new()
    }

    #[test]
    fn test_scalar_type_table() {
        let c = converter();
        assert_eq!(
            c.to_native(PropertyKind::String, "hello").unwrap(),
            NativeValue::String("hello".to_string())
        );
        assert_eq!(
            c.to_native(PropertyKind::Boolean, "true").unwrap(),
            NativeValue::Boolean(true)
        );
        assert_eq!(
            c.to_native(PropertyKind::Long, "-42").unwrap(),
            NativeValue::Long(-42)
        );
        assert_eq!(
            c.to_native(PropertyKind::Double, "2.5").unwrap(),
            NativeValue::Double(2.5)
        );
        assert_eq!(
            c.to_native(PropertyKind::Decimal, "123456789012345678901234567890.42")
                .unwrap(),
            NativeValue::Decimal("123456789012345678901234567890.42".to_string())
        );
    }

    #[test]
    fn test_malformed_scalars_fail() {
        let c = converter();
        assert!(c.to_native(PropertyKind::Boolean, "TRUE").is_err());
        assert!(c.to_native(PropertyKind::Long, "12.5").is_err());
        assert!(c.to_native(PropertyKind::Double, "abc").is_err());
        assert!(c.to_native(PropertyKind::Decimal, "1.2.3").is_err());
        assert!(c.to_native(PropertyKind::Decimal, "e10").is_err());
        assert!(c.to_native(PropertyKind::Date, "2024-13-40").is_err());
    }

    #[test]
    fn test_binary_path_undefined_have_no_scalar_conversion() {
        let c = converter();
        for kind in [
            PropertyKind::Binary,
            PropertyKind::Path,
            PropertyKind::Undefined,
        ] {
            assert!(matches!(
                c.to_native(kind, "x"),
                Err(ConversionError::Unsupported { .. })
            ));
        }
    }

    #[test]
    fn test_date_round_trip_is_canonical() {
        let c = converter();
        let input = "2024-01-15T10:30:00+01:00";
        let native = c.to_native(PropertyKind::Date, input).unwrap();
        assert_eq!(c.to_text(&native).unwrap(), input);
    }

    #[test]
    fn test_scalar_round_trips() {
        let c = converter();
        for (kind, input) in [
            (PropertyKind::String, "some text"),
            (PropertyKind::Boolean, "false"),
            (PropertyKind::Long, "9007199254740993"),
            (PropertyKind::Decimal, "-0.000000000000000000001"),
        ] {
            let native = c.to_native(kind, input).unwrap();
            assert_eq!(c.to_text(&native).unwrap(), input);
        }
    }

    #[test]
    fn test_small_binary_stays_inline() {
        let c = converter();
        let payload = BinaryValue::from_bytes(vec![1, 2, 3]).with_media_type("image/png");
        let native = c.binary_to_native(&payload).unwrap();

        let round = c.to_binary_payload(&native).unwrap();
        assert!(round.is_inline());
        assert_eq!(round.bytes().unwrap(), vec![1, 2, 3]);
        assert_eq!(round.media_type(), Some("image/png"));
    }

    #[test]
    fn test_large_binary_spills_with_inferred_extension() {
        let dir = tempfile::tempdir().unwrap();
        let c = converter()
            .with_data_uri_size_threshold(8)
            .with_spool_dir(dir.path());

        let payload = BinaryValue::from_bytes(vec![0u8; 64]).with_media_type("image/png");
        let native = NativeValue::Binary(payload);

        let spilled = c.to_binary_payload(&native).unwrap();
        assert!(!spilled.is_inline());
        let path = spilled.external_path().unwrap();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("png"));
        assert!(path.starts_with(dir.path()));
        assert_eq!(spilled.bytes().unwrap(), vec![0u8; 64]);
    }

    #[test]
    fn test_spill_extension_defaults_to_bin() {
        assert_eq!(extension_for(None), "bin");
        assert_eq!(extension_for(Some("application/octet-stream")), "octet");
        assert_eq!(extension_for(Some("image/svg+xml")), "svg");
    }

    #[test]
    fn test_binary_to_text_renders_data_uri() {
        let c = converter();
        let native = NativeValue::Binary(BinaryValue::from_bytes(b"abc".to_vec()));
        let text = c.to_text(&native).unwrap();
        assert!(text.starts_with("data:;base64,"));
    }

    proptest! {
        #[test]
        fn prop_long_round_trip(n in any::<i64>()) {
            let c = converter();
            let native = c.to_native(PropertyKind::Long, &n.to_string()).unwrap();
            prop_assert_eq!(native, NativeValue::Long(n));
        }

        #[test]
        fn prop_double_round_trip(d in any::<f64>().prop_filter("finite", |d| d.is_finite())) {
            let c = converter();
            let text = d.to_string();
            let native = c.to_native(PropertyKind::Double, &text).unwrap();
            match native {
                NativeValue::Double(back) => prop_assert_eq!(back, d),
                other => prop_assert!(false, "unexpected value {:?}", other),
            }
        }

        #[test]
        fn prop_valid_decimals_accepted(
            sign in proptest::option::of(prop_oneof!["-", "\\+"]),
            int_part in "[0-9]{1,30}",
            frac in proptest::option::of("[0-9]{1,30}"),
        ) {
            let mut s = sign.unwrap_or_default().to_string();
            s.push_str(&int_part);
            if let Some(frac) = frac {
                s.push('.');
                s.push_str(&frac);
            }
            let c = converter();
            let native = c.to_native(PropertyKind::Decimal, &s).unwrap();
            prop_assert_eq!(native, NativeValue::Decimal(s));
        }
    }
}
