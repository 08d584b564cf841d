use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub(crate) struct Api {
    pub(crate) port: u16,
    pub(crate) token: Option<String>,
}

impl Default for Api {
    fn default() -> Self {
        Api {
            port: 3030,
            token: None,
        }
    }
}
