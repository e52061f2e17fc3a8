use serde::{Deserialize, Serialize};

/// Printer series understood by the device layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrinterSeries {
    TmM10,
    TmM30,
    TmP20,
    TmP60,
    TmP60II,
    TmP80,
    TmT20,
    TmT60,
    TmT70,
    TmT81,
    TmT82,
    TmT83,
    TmT88,
    TmT90,
    TmT90KP,
    TmU220,
    TmU330,
    TmL90,
    TmH6000,
}

/// Model name to series lookup, sorted by model name
const MODEL_TABLE: &[(&str, PrinterSeries)] = &[
    ("TM-H6000", PrinterSeries::TmH6000),
    ("TM-L90", PrinterSeries::TmL90),
    ("TM-M10", PrinterSeries::TmM10),
    ("TM-M30", PrinterSeries::TmM30),
    ("TM-P10", PrinterSeries::TmP20),
    ("TM-P60", PrinterSeries::TmP60),
    ("TM-P60II", PrinterSeries::TmP60II),
    ("TM-P80", PrinterSeries::TmP80),
    ("TM-T20", PrinterSeries::TmT20),
    ("TM-T60", PrinterSeries::TmT60),
    ("TM-T70", PrinterSeries::TmT70),
    ("TM-T81", PrinterSeries::TmT81),
    ("TM-T82", PrinterSeries::TmT82),
    ("TM-T83", PrinterSeries::TmT83),
    ("TM-T88", PrinterSeries::TmT88),
    ("TM-T88VI", PrinterSeries::TmT88),
    ("TM-T90", PrinterSeries::TmT90),
    ("TM-T90KP", PrinterSeries::TmT90KP),
    ("TM-U220", PrinterSeries::TmU220),
    ("TM-U330", PrinterSeries::TmU330),
];

impl PrinterSeries {
    /// Resolve a marketing model name (e.g. `TM-T88VI`) to its series
    pub fn from_model_name(name: &str) -> Option<Self> {
        let name = name.trim();
        MODEL_TABLE
            .iter()
            .find(|(model, _)| model.eq_ignore_ascii_case(name))
            .map(|(_, series)| *series)
    }

    /// Every model name accepted by [`PrinterSeries::from_model_name`]
    pub fn supported_models() -> Vec<&'static str> {
        MODEL_TABLE.iter().map(|(model, _)| *model).collect()
    }
}

impl Default for PrinterSeries {
    fn default() -> Self {
        Self::TmT88
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_models_resolve() {
        assert_eq!(
            PrinterSeries::from_model_name("TM-M30"),
            Some(PrinterSeries::TmM30)
        );
        assert_eq!(
            PrinterSeries::from_model_name("tm-u220"),
            Some(PrinterSeries::TmU220)
        );
    }

    #[test]
    fn test_model_aliases() {
        assert_eq!(
            PrinterSeries::from_model_name("TM-T88VI"),
            Some(PrinterSeries::TmT88)
        );
        assert_eq!(
            PrinterSeries::from_model_name("TM-P10"),
            Some(PrinterSeries::TmP20)
        );
    }

    #[test]
    fn test_unknown_model() {
        assert_eq!(PrinterSeries::from_model_name("LX-350"), None);
    }

    #[test]
    fn test_supported_models_sorted_and_complete() {
        let models = PrinterSeries::supported_models();
        assert_eq!(models.len(), 20);

        let mut sorted = models.clone();
        sorted.sort_unstable();
        assert_eq!(models, sorted);
    }
}
