use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Time(time::OffsetDateTime);

pub(crate) const TIME_FORMAT : &'static [time::format_description::FormatItem<
    'static,
>] = time::macros::format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second]"
);

impl Time {
    pub fn now() -> Self {
        Time(time::OffsetDateTime::now_utc())
    }

    /// The text stored in the `created` column.
    pub fn to_column(&self) -> crate::Result<String> {
        Ok(self.0.format(&TIME_FORMAT)?)
    }
}

impl Serialize for Time {
    fn serialize<S>(
        &self,
        serializer : S,
    ) -> std::result::Result<S::Ok, S::Error>
    where
        S : Serializer,
    {
        self.format(&TIME_FORMAT)
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl From<time::OffsetDateTime> for Time {
    fn from(t : time::OffsetDateTime) -> Self {
        Time(t)
    }
}

impl std::ops::Deref for Time {
    type Target = time::OffsetDateTime;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_text_has_second_precision() {
        let t : Time = time::macros::datetime!(2024-03-05 07:08:09 UTC).into();

        assert_eq!(t.to_column().unwrap(), "2024-03-05 07:08:09");
        assert_eq!(
            serde_json::to_string(&t).unwrap(),
            "\"2024-03-05 07:08:09\""
        );
    }
}
