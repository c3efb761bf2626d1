use super::soil::canonical_key;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CropTarget {
    Rice,
    Wheat,
    Maize,
    Sugarcane,
    Cotton,
    Pulses,
    Vegetables,
    Fruits,
}

impl CropTarget {
    pub fn all() -> &'static [CropTarget] {
        &[
            CropTarget::Rice,
            CropTarget::Wheat,
            CropTarget::Maize,
            CropTarget::Sugarcane,
            CropTarget::Cotton,
            CropTarget::Pulses,
            CropTarget::Vegetables,
            CropTarget::Fruits,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CropTarget::Rice => "Rice",
            CropTarget::Wheat => "Wheat",
            CropTarget::Maize => "Maize",
            CropTarget::Sugarcane => "Sugarcane",
            CropTarget::Cotton => "Cotton",
            CropTarget::Pulses => "Pulses",
            CropTarget::Vegetables => "Vegetables",
            CropTarget::Fruits => "Fruits",
        }
    }

    /// Exact names plus a short, explicit alias list. Anything else is
    /// unknown; there is no substring guessing.
    pub fn from_str(s: &str) -> Option<Self> {
        match canonical_key(s).as_str() {
            "rice" | "paddy" => Some(CropTarget::Rice),
            "wheat" => Some(CropTarget::Wheat),
            "maize" | "corn" => Some(CropTarget::Maize),
            "sugarcane" => Some(CropTarget::Sugarcane),
            "cotton" => Some(CropTarget::Cotton),
            "pulses" | "pulse" | "legumes" | "legume" => Some(CropTarget::Pulses),
            "vegetables" | "vegetable" => Some(CropTarget::Vegetables),
            "fruits" | "fruit" => Some(CropTarget::Fruits),
            _ => None,
        }
    }
}

impl std::fmt::Display for CropTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_from_str_valid() {
        assert_eq!(CropTarget::from_str("Rice"), Some(CropTarget::Rice));
        assert_eq!(CropTarget::from_str("paddy"), Some(CropTarget::Rice));
        assert_eq!(CropTarget::from_str("corn"), Some(CropTarget::Maize));
        assert_eq!(CropTarget::from_str(" PULSES "), Some(CropTarget::Pulses));
        assert_eq!(CropTarget::from_str("legume"), Some(CropTarget::Pulses));
        assert_eq!(
            CropTarget::from_str("vegetable"),
            Some(CropTarget::Vegetables)
        );
    }

    #[test]
    fn crop_from_str_invalid() {
        assert_eq!(CropTarget::from_str("barley"), None);
        assert_eq!(CropTarget::from_str(""), None);
        // no substring matching
        assert_eq!(CropTarget::from_str("rice paddy"), None);
        assert_eq!(CropTarget::from_str("chickpea"), None);
    }

    #[test]
    fn crop_round_trip() {
        for crop in CropTarget::all() {
            let debug_str = format!("{:?}", crop);
            assert_eq!(
                CropTarget::from_str(&debug_str),
                Some(*crop),
                "Round-trip failed for {:?}",
                crop
            );
        }
    }
}
