//! Credential extraction from a kind kubeconfig.
//!
//! Only the first cluster entry and the first user entry are read. Anything
//! missing comes back as an empty string so token-based or partial
//! kubeconfigs still produce a state.

use crate::error::ControllerError;
use serde_yaml::{Mapping, Value};

/// Connection details read from a kubeconfig
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub endpoint: String,
    pub cluster_ca_certificate: String,
    pub client_certificate: String,
    pub client_key: String,
}

/// Parse the connection details out of a kubeconfig document.
///
/// Fails only when the document is not a YAML mapping.
pub fn parse_credentials(kubeconfig: &str) -> Result<Credentials, ControllerError> {
    let document: Mapping = serde_yaml::from_str(kubeconfig)
        .map_err(|e| ControllerError::CredentialParse(e.to_string()))?;

    let cluster = first_entry(&document, "clusters", "cluster");
    let user = first_entry(&document, "users", "user");

    Ok(Credentials {
        endpoint: string_field(cluster, "server"),
        cluster_ca_certificate: string_field(cluster, "certificate-authority-data"),
        client_certificate: string_field(user, "client-certificate-data"),
        client_key: string_field(user, "client-key-data"),
    })
}

/// `document[list][0][key]`
fn first_entry<'a>(document: &'a Mapping, list: &str, key: &str) -> Option<&'a Value> {
    document.get(list)?.as_sequence()?.first()?.get(key)
}

fn string_field(entry: Option<&Value>, key: &str) -> String {
    entry
        .and_then(|entry| entry.get(key))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
