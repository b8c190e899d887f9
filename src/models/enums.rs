use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(AppointmentKind {
    Appointment => "appointment",
    Medication => "medication",
    Reminder => "reminder",
});

str_enum!(RecordType {
    Image => "image",
    Pdf => "pdf",
    Text => "text",
});

str_enum!(RecordCategory {
    Allergy => "allergy",
    Medication => "medication",
    Condition => "condition",
    Vaccine => "vaccine",
    Test => "test",
    Other => "other",
});

str_enum!(NotificationType {
    Info => "info",
    Warning => "warning",
    Success => "success",
    Error => "error",
    Reminder => "reminder",
});

str_enum!(Priority {
    Low => "low",
    Medium => "medium",
    High => "high",
});

str_enum!(RelatedEventType {
    Appointment => "appointment",
    MedicalRecord => "medical_record",
    Symptom => "symptom",
});

str_enum!(AlertPermission {
    Granted => "granted",
    Denied => "denied",
    Default => "default",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn notification_type_round_trip() {
        for (variant, s) in [
            (NotificationType::Info, "info"),
            (NotificationType::Warning, "warning"),
            (NotificationType::Success, "success"),
            (NotificationType::Error, "error"),
            (NotificationType::Reminder, "reminder"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(NotificationType::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn related_event_type_uses_snake_case() {
        assert_eq!(RelatedEventType::MedicalRecord.as_str(), "medical_record");
        let json = serde_json::to_string(&RelatedEventType::MedicalRecord).unwrap();
        assert_eq!(json, "\"medical_record\"");
    }

    #[test]
    fn serde_matches_as_str() {
        let json = serde_json::to_string(&Priority::High).unwrap();
        assert_eq!(json, format!("\"{}\"", Priority::High.as_str()));
        let parsed: RecordCategory = serde_json::from_str("\"vaccine\"").unwrap();
        assert_eq!(parsed, RecordCategory::Vaccine);
    }

    #[test]
    fn invalid_value_is_rejected() {
        let err = Priority::from_str("urgent").unwrap_err();
        assert!(err.to_string().contains("Priority"));
        assert!(err.to_string().contains("urgent"));
    }
}
