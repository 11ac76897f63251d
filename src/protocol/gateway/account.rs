use serde::Deserialize;

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct AccountStatus {
    pub account: Account,

    #[serde(default)]
    pub plus: Option<Plus>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Absent for anonymous sessions.
    #[serde(default)]
    pub uid: Option<u64>,

    #[serde(default)]
    pub login: Option<String>,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub service_available: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plus {
    #[serde(default)]
    pub has_plus: bool,
}

impl AccountStatus {
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.account.uid.is_none()
    }

    #[must_use]
    pub fn has_plus(&self) -> bool {
        self.plus.as_ref().is_some_and(|plus| plus.has_plus)
    }
}
