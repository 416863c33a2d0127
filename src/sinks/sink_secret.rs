use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::api::{Api, PostParams};
use kube::Client;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::settings::KubernetesSecretConfig;
use crate::errors::SinkError;
use crate::helpers::time::now;

pub const DOCKERCONFIGJSON_KEY: &str = ".dockerconfigjson";
pub const DOCKERCONFIGJSON_TYPE: &str = "kubernetes.io/dockerconfigjson";
pub const OPAQUE_TYPE: &str = "Opaque";
const ANNOTATION_LAST_REFRESH: &str = "acr-autologin/last-refresh";

/// Upserts the credential document into a Kubernetes secret.
///
/// The client is created on first use from KUBECONFIG or the in-cluster service account.
pub struct SecretSink {
    pub config: KubernetesSecretConfig,
    client: OnceCell<Client>,
}

impl SecretSink {
    pub fn new(config: KubernetesSecretConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    pub fn name(&self) -> String {
        format!("secret:{}/{}", self.config.namespace, self.config.name)
    }

    async fn client(&self) -> Result<&Client, SinkError> {
        self.client
            .get_or_try_init(|| async { Client::try_default().await })
            .await
            .map_err(SinkError::from)
    }

    pub async fn write(&self, content: &[u8]) -> Result<(), SinkError> {
        let client = self.client().await?.clone();
        let api: Api<Secret> = Api::namespaced(client, &self.config.namespace);
        let name = self.config.name.as_str();

        match api.get_opt(name).await? {
            Some(existing) => {
                let mut secret = build_secret(&self.config, content);
                secret.metadata.resource_version = existing.metadata.resource_version;
                api.replace(name, &PostParams::default(), &secret).await?;
                info!(namespace = %self.config.namespace, secret = %name, "kubernetes secret updated");
            }
            None => {
                debug!(namespace = %self.config.namespace, secret = %name, "secret does not exist, creating");
                api.create(&PostParams::default(), &build_secret(&self.config, content))
                    .await?;
                info!(namespace = %self.config.namespace, secret = %name, "kubernetes secret created");
            }
        }
        Ok(())
    }
}

/// Secret type follows the data key, kubelet only accepts `.dockerconfigjson` in typed pull secrets.
pub fn secret_type(key: &str) -> &'static str {
    if key == DOCKERCONFIGJSON_KEY {
        DOCKERCONFIGJSON_TYPE
    } else {
        OPAQUE_TYPE
    }
}

pub fn build_secret(config: &KubernetesSecretConfig, content: &[u8]) -> Secret {
    let mut data = BTreeMap::new();
    data.insert(config.key.to_owned(), ByteString(content.to_vec()));

    let mut annotations = BTreeMap::new();
    annotations.insert(ANNOTATION_LAST_REFRESH.to_owned(), now().to_rfc3339());

    Secret {
        metadata: ObjectMeta {
            name: Some(config.name.to_owned()),
            namespace: Some(config.namespace.to_owned()),
            annotations: Some(annotations),
            ..Default::default()
        },
        type_: Some(secret_type(&config.key).to_owned()),
        data: Some(data),
        ..Default::default()
    }
}
