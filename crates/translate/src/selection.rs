use std::fmt;

/// 語言角色。 / Which of the two language roles a selection refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Source,
    Target,
}

impl Slot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Source => "source",
            Slot::Target => "target",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageSelection {
    pub slot: Slot,
    pub value: Option<String>,
}

impl LanguageSelection {
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}
