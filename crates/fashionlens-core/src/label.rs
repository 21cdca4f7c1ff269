//! Display label composition

use crate::types::Category;

/// Separator used inside compound sub-type labels such as `Topwear_Tshirts`
pub const SUBTYPE_SEPARATOR: char = '_';

/// Compose the display label for a prediction
///
/// With a sub-type: `"{category} {subtype words} from {brand}"`, where the
/// sub-type separator becomes a space. Without one: `"{category} {brand}"`.
pub fn compose(category: Category, subtype: Option<&str>, brand: &str) -> String {
    match subtype {
        Some(subtype) => format!("{} {} from {}", category, subtype_words(subtype), brand),
        None => format!("{} {}", category, brand),
    }
}

/// `"Shoes_Casual Shoes"` -> `"Shoes Casual Shoes"`
pub fn subtype_words(subtype: &str) -> String {
    subtype.replace(SUBTYPE_SEPARATOR, " ")
}
