use chrono::Weekday;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
}

impl TryFrom<String> for MealType {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "day_of_week": "monday",
    "meal_type": "breakfast",
    "items": ["idli", "sambar", "tea"],
    "meal_time": "07:30 - 09:30"
}))]
pub struct MessMenu {
    pub id: u64,
    pub day_of_week: String,
    #[sqlx(try_from = "String")]
    pub meal_type: MealType,
    #[schema(value_type = Vec<String>)]
    pub items: Json<Vec<String>>,
    pub meal_time: String,
}

impl MessMenu {
    /// Position in the week, Monday first. Unknown day names sort last.
    pub fn day_order(&self) -> u32 {
        day_order(&self.day_of_week)
    }
}

pub fn day_order(day: &str) -> u32 {
    day.parse::<Weekday>()
        .map(|w| w.num_days_from_monday())
        .unwrap_or(7)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekdays_order_from_monday() {
        assert_eq!(day_order("monday"), 0);
        assert_eq!(day_order("Sunday"), 6);
        assert_eq!(day_order("someday"), 7);
    }

    #[test]
    fn meal_types_parse_lowercase() {
        assert_eq!(MealType::try_from("dinner".to_string()).unwrap(), MealType::Dinner);
        assert!(MealType::try_from("brunch".to_string()).is_err());
    }
}
