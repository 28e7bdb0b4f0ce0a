//! ServiceNow client - owns the HTTP connection pool and credentials

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client;
use url::Url;

use crate::api::{ApiRequest, ApiResponse, AttachmentApi, BatchApi, TableApi};
use crate::attachment::Attachment;
use crate::auth::{Authenticator, Credentials};
use crate::error::{Error, Result};
use crate::instance::{base_str, normalize_instance};
use crate::record::GlideRecord;

pub const DEFAULT_BATCH_SIZE: usize = 100;
const DEFAULT_USER_AGENT: &str = concat!("snc/", env!("CARGO_PKG_VERSION"));

/// PEM encoded client certificate and PKCS#8 key for mutual TLS
#[derive(Clone)]
pub struct ClientCert {
    pub cert_pem: Vec<u8>,
    pub key_pem: Vec<u8>,
}

pub struct ClientBuilder {
    instance: String,
    credentials: Option<Credentials>,
    cert: Option<ClientCert>,
    proxy: Option<String>,
    verify: Option<bool>,
    timeout: Duration,
    connect_timeout: Duration,
    user_agent: String,
    allow_insecure_http: bool,
    batch_size: usize,
}

impl ClientBuilder {
    pub fn new(instance: &str) -> Self {
        Self {
            instance: instance.to_string(),
            credentials: None,
            cert: None,
            proxy: None,
            verify: None,
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(20),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            allow_insecure_http: false,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn basic_auth(self, username: &str, password: &str) -> Self {
        self.credentials(Credentials::basic(username, password))
    }

    pub fn client_cert(mut self, cert: ClientCert) -> Self {
        self.cert = Some(cert);
        self
    }

    /// HTTP(S) proxy, e.g. `http://proxy:8080`
    pub fn proxy(mut self, proxy: &str) -> Self {
        self.proxy = Some(proxy.to_string());
        self
    }

    /// Verify the server certificate. Defaults to on; turning it off is only
    /// sensible behind an intercepting proxy with a self-signed certificate.
    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = Some(verify);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    /// Accept `http://` instance URLs (local mock servers)
    pub fn allow_insecure_http(mut self, allow: bool) -> Self {
        self.allow_insecure_http = allow;
        self
    }

    /// Default batch size for records created through this client
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn build(self) -> Result<ServiceNowClient> {
        let instance = normalize_instance(&self.instance, self.allow_insecure_http)?;

        if self.credentials.is_some() && self.cert.is_some() {
            return Err(Error::Authentication("Cannot specify both auth and cert".to_string()));
        }
        if self.credentials.is_none() && self.cert.is_none() {
            return Err(Error::Authentication("No valid authentication method provided".to_string()));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidArgument("batch size must be positive".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = Client::builder()
            .default_headers(headers)
            .connect_timeout(self.connect_timeout)
            .timeout(self.timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .user_agent(self.user_agent.as_str());

        if let Some(proxy) = &self.proxy {
            if !proxy.is_empty() {
                builder = builder.proxy(reqwest::Proxy::all(proxy.as_str())?);
                tracing::info!("Using proxy: {}", proxy);
            }
        }

        if self.verify == Some(false) {
            tracing::warn!("TLS certificate verification is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(cert) = &self.cert {
            let identity = reqwest::Identity::from_pkcs8_pem(&cert.cert_pem, &cert.key_pem)?;
            builder = builder.identity(identity);
        }

        let http = builder.build()?;
        let auth = self
            .credentials
            .map(|credentials| Authenticator::new(http.clone(), base_str(&instance), credentials));

        Ok(ServiceNowClient {
            inner: Arc::new(Inner {
                instance,
                http,
                auth,
                batch_size: self.batch_size,
                batch_counter: AtomicU64::new(0),
            }),
        })
    }
}

struct Inner {
    instance: Url,
    http: Client,
    auth: Option<Authenticator>,
    batch_size: usize,
    batch_counter: AtomicU64,
}

/// Handle to one ServiceNow instance. Cloning is cheap and shares the
/// connection pool and OAuth token.
#[derive(Clone)]
pub struct ServiceNowClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ServiceNowClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceNowClient")
            .field("instance", &self.instance())
            .finish()
    }
}

impl ServiceNowClient {
    pub fn builder(instance: &str) -> ClientBuilder {
        ClientBuilder::new(instance)
    }

    /// Shorthand for a basic-auth client
    pub fn new(instance: &str, credentials: Credentials) -> Result<Self> {
        ClientBuilder::new(instance).credentials(credentials).build()
    }

    /// Instance URL without trailing slash, e.g. `https://dev0000.service-now.com`
    pub fn instance(&self) -> &str {
        base_str(&self.inner.instance)
    }

    pub fn default_batch_size(&self) -> usize {
        self.inner.batch_size
    }

    pub fn glide_record(&self, table: &str) -> GlideRecord {
        GlideRecord::new(self.clone(), table, self.inner.batch_size)
    }

    pub fn glide_record_with_batch_size(&self, table: &str, batch_size: usize) -> GlideRecord {
        GlideRecord::new(self.clone(), table, batch_size)
    }

    pub fn attachment(&self, table: &str) -> Attachment {
        Attachment::new(self.clone(), table)
    }

    pub fn table_api(&self) -> TableApi {
        TableApi::new(self.clone())
    }

    pub fn attachment_api(&self) -> AttachmentApi {
        AttachmentApi::new(self.clone())
    }

    /// A fresh, empty batch
    pub fn batch_api(&self) -> BatchApi {
        BatchApi::new(self.clone())
    }

    /// Run the OAuth grant up front rather than on the first request
    pub async fn authenticate(&self) -> Result<()> {
        match &self.inner.auth {
            Some(auth) => auth.authenticate().await,
            None => Ok(()),
        }
    }

    pub(crate) fn next_batch_id(&self) -> u64 {
        self.inner.batch_counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn dispatch(&self, request: ApiRequest) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.instance(), request.path);
        tracing::debug!("{} {}", request.method, url);

        let mut builder = self.inner.http.request(request.method.clone(), &url);
        if !request.params.is_empty() {
            builder = builder.query(&request.params.iter().collect::<Vec<_>>());
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        if let Some(auth) = &self.inner.auth {
            builder = auth.apply(builder).await?;
        }

        Ok(builder.send().await?)
    }

    /// Send a request and read the response without checking its status
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let response = self.dispatch(request).await?;
        let response = ApiResponse::read(response).await?;
        tracing::debug!("-> {}", response.status);
        Ok(response)
    }

    /// Send a request, turning any status >= 400 into an error
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.send(request).await?.validate()
    }

    /// Like [`execute`](Self::execute) but leaves the body unread for streaming
    pub async fn execute_stream(&self, request: ApiRequest) -> Result<reqwest::Response> {
        let response = self.dispatch(request).await?;
        let status = response.status().as_u16();
        if status >= 400 {
            return match ApiResponse::read(response).await?.validate() {
                Err(e) => Err(e),
                Ok(_) => Err(Error::Request(format!("HTTP {}", status))),
            };
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_credentials() {
        match ServiceNowClient::builder("dev0000").build() {
            Err(Error::Authentication(msg)) => assert!(msg.contains("No valid authentication")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_rejects_auth_and_cert() {
        let result = ServiceNowClient::builder("dev0000")
            .basic_auth("admin", "admin")
            .client_cert(ClientCert {
                cert_pem: Vec::new(),
                key_pem: Vec::new(),
            })
            .build();
        match result {
            Err(Error::Authentication(msg)) => assert!(msg.contains("both auth and cert")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_instance_normalized() {
        let client = ServiceNowClient::new("dev0000", Credentials::basic("admin", "admin")).unwrap();
        assert_eq!(client.instance(), "https://dev0000.service-now.com");
        assert_eq!(client.default_batch_size(), DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_batch_ids_increase() {
        let client = ServiceNowClient::new("dev0000", Credentials::basic("admin", "admin")).unwrap();
        let first = client.next_batch_id();
        assert_eq!(client.next_batch_id(), first + 1);
    }
}
