#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub(crate) struct Entity {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

impl Entity {
    /// Checks the address ends with `@domain`, ignoring case.
    pub fn belongs_to(&self, domain: &str) -> bool {
        self.email
            .rsplit_once('@')
            .is_some_and(|(local, host)| !local.is_empty() && host.eq_ignore_ascii_case(domain))
    }
}
