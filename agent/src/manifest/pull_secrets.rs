//! Kubernetes image pull secret injection

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use crate::errors::AgentError;
use crate::models::stack::RegistryCredential;

/// Workload kinds whose pod template receives the secret references
const TEMPLATED_KINDS: &[&str] = &["Deployment", "StatefulSet", "DaemonSet", "ReplicaSet", "Job"];

/// Rewrite a multi-document Kubernetes manifest to authenticate image pulls.
///
/// Appends one `kubernetes.io/dockerconfigjson` secret per credential and
/// inserts matching `imagePullSecrets` references into every pod spec. All
/// other fields are preserved.
pub fn add_image_pull_secrets(
    manifest: &str,
    credentials: &[RegistryCredential],
) -> Result<String, AgentError> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(manifest) {
        let value = Value::deserialize(document)?;
        if !value.is_null() {
            documents.push(value);
        }
    }

    let names: Vec<String> = credentials.iter().map(|c| secret_name(&c.server_url)).collect();

    for document in &mut documents {
        inject_references(document, &names);
    }

    for (credential, name) in credentials.iter().zip(&names) {
        documents.push(secret_document(credential, name)?);
    }

    let mut out = String::new();
    for (i, document) in documents.iter().enumerate() {
        if i > 0 {
            out.push_str("---\n");
        }
        out.push_str(&serde_yaml::to_string(document)?);
    }

    Ok(out)
}

/// Secret name derived from the registry host, e.g.
/// `registry.example.com` becomes `registry-example-com-secret`.
fn secret_name(server_url: &str) -> String {
    let host = server_url
        .trim_start_matches("https://")
        .trim_start_matches("http://");

    let slug: String = host
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();

    format!("{}-secret", slug.trim_matches('-'))
}

/// Insert `imagePullSecrets` references into the pod spec of a document,
/// when the document has one.
fn inject_references(document: &mut Value, names: &[String]) {
    let Some(kind) = document.get("kind").and_then(Value::as_str).map(str::to_owned) else {
        return;
    };

    let pod_spec = if kind == "Pod" {
        document.get_mut("spec")
    } else if TEMPLATED_KINDS.contains(&kind.as_str()) {
        document
            .get_mut("spec")
            .and_then(|spec| spec.get_mut("template"))
            .and_then(|template| template.get_mut("spec"))
    } else {
        None
    };

    let Some(Value::Mapping(spec)) = pod_spec else {
        return;
    };

    let entry = spec
        .entry(Value::from("imagePullSecrets"))
        .or_insert_with(|| Value::Sequence(Vec::new()));

    let Value::Sequence(references) = entry else {
        return;
    };

    for name in names {
        let mut reference = Mapping::new();
        reference.insert(Value::from("name"), Value::from(name.as_str()));
        let reference = Value::Mapping(reference);

        if !references.contains(&reference) {
            references.push(reference);
        }
    }
}

/// Build the secret document for one credential
fn secret_document(credential: &RegistryCredential, name: &str) -> Result<Value, AgentError> {
    let auth = BASE64.encode(format!("{}:{}", credential.username, credential.secret));

    let docker_config = serde_json::json!({
        "auths": {
            &credential.server_url: {
                "username": credential.username,
                "password": credential.secret,
                "auth": auth,
            }
        }
    });

    let document = serde_json::json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": { "name": name },
        "type": "kubernetes.io/dockerconfigjson",
        "data": { ".dockerconfigjson": BASE64.encode(serde_json::to_vec(&docker_config)?) },
    });

    Ok(serde_yaml::to_value(document)?)
}
