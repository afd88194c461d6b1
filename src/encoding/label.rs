use serde::{Deserialize, Serialize};

use super::EncodingError;

/// Code assigned to categories the encoder never saw during fit.
pub const UNSEEN_CODE: u32 = 0;

/// Outcome of encoding one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoded {
    Known(u32),
    /// The category was not part of the fitted classes; carries [`UNSEEN_CODE`].
    Unseen(u32),
}

impl Encoded {
    pub fn code(self) -> u32 {
        match self {
            Encoded::Known(code) | Encoded::Unseen(code) => code,
        }
    }

    pub fn is_unseen(self) -> bool {
        matches!(self, Encoded::Unseen(_))
    }
}

/// Maps category strings to dense integer codes.
///
/// Classes are stored sorted, so a code is the class's position in
/// lexicographic order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit<'a, I>(values: I) -> Result<Self, EncodingError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut classes: Vec<String> = values.into_iter().map(str::to_string).collect();
        if classes.is_empty() {
            return Err(EncodingError::EmptyColumn);
        }
        classes.sort();
        classes.dedup();
        Ok(Self { classes })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn encode(&self, value: &str) -> Encoded {
        match self.classes.binary_search_by(|class| class.as_str().cmp(value)) {
            Ok(idx) => Encoded::Known(idx as u32),
            Err(_) => Encoded::Unseen(UNSEEN_CODE),
        }
    }

    pub fn decode(&self, code: u32) -> Option<&str> {
        self.classes.get(code as usize).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_sorts_and_deduplicates_classes() {
        let encoder = LabelEncoder::fit(["IoT", "FinTech", "IoT", "Gaming"]).expect("fit");
        assert_eq!(encoder.classes(), &["FinTech", "Gaming", "IoT"]);
        assert_eq!(encoder.encode("Gaming"), Encoded::Known(1));
        assert_eq!(encoder.decode(2), Some("IoT"));
    }

    #[test]
    fn unseen_category_resolves_to_default_code() {
        let encoder = LabelEncoder::fit(["FinTech", "Gaming"]).expect("fit");
        let encoded = encoder.encode("Biotech");
        assert!(encoded.is_unseen());
        assert_eq!(encoded.code(), UNSEEN_CODE);
    }

    #[test]
    fn fit_rejects_empty_input() {
        let err = LabelEncoder::fit(std::iter::empty()).unwrap_err();
        assert_eq!(err, EncodingError::EmptyColumn);
    }
}
