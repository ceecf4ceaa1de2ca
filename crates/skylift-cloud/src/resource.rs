//! Declarative resource descriptions submitted to the provisioning backend.
//!
//! Nothing here talks to a cloud. A [`Resource`] is a logical id plus a
//! [`ResourceKind`] whose properties may reference attributes of other
//! resources through [`Expr`]; the backend resolves those references when it
//! applies the graph.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use skylift_core::ObjectUpload;

/// Attribute of a resource that only exists once the backend created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Attr {
    Arn,
    Name,
    Id,
    /// `<bucket>.s3.<region>.amazonaws.com`
    RegionalDomainName,
    WebsiteEndpoint,
    InvokeArn,
    ExecutionArn,
    ApiEndpoint,
    Url,
    RegionalDomainNameTarget,
}

/// A property value, possibly depending on other resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Expr {
    Literal(String),
    Ref {
        #[serde(rename = "ref")]
        resource: String,
        attr: Attr,
    },
    Concat {
        concat: Vec<Expr>,
    },
}

impl Expr {
    pub fn lit(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    pub fn attr(resource: impl Into<String>, attr: Attr) -> Self {
        Self::Ref {
            resource: resource.into(),
            attr,
        }
    }

    pub fn concat(parts: impl IntoIterator<Item = Expr>) -> Self {
        Self::Concat {
            concat: parts.into_iter().collect(),
        }
    }

    /// Ids of every resource this expression reads from.
    pub fn references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Literal(_) => {}
            Self::Ref { resource, .. } => out.push(resource),
            Self::Concat { concat } => concat.iter().for_each(|e| e.collect_references(out)),
        }
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Self::lit(value)
    }
}

impl From<String> for Expr {
    fn from(value: String) -> Self {
        Self::Literal(value)
    }
}

// ── Shared property types ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ObjectOwnership {
    BucketOwnerEnforced,
    BucketOwnerPreferred,
}

/// Access-block flags of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccessBlock {
    pub block_public_acls: bool,
    pub ignore_public_acls: bool,
    pub block_public_policy: bool,
    pub restrict_public_buckets: bool,
}

impl AccessBlock {
    /// Object ACLs stay blocked; a bucket policy may grant public read.
    pub const BLOCK_ACLS: Self = Self {
        block_public_acls: true,
        ignore_public_acls: true,
        block_public_policy: false,
        restrict_public_buckets: false,
    };

    pub const BLOCK_ALL: Self = Self {
        block_public_acls: true,
        ignore_public_acls: true,
        block_public_policy: true,
        restrict_public_buckets: true,
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorsRule {
    pub allowed_methods: Vec<String>,
    pub allowed_origins: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub allow_credentials: bool,
}

impl CorsRule {
    /// Every origin, header and method; no credentials.
    pub fn permissive() -> Self {
        Self {
            allowed_methods: vec!["*".to_owned()],
            allowed_origins: vec!["*".to_owned()],
            allowed_headers: vec!["*".to_owned()],
            allow_credentials: false,
        }
    }

    /// Write verbs from any origin, as used on public buckets.
    pub fn bucket_writes() -> Self {
        Self {
            allowed_methods: ["PUT", "POST", "DELETE"].map(str::to_owned).to_vec(),
            ..Self::permissive()
        }
    }
}

/// IAM-style policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<Statement>,
}

impl PolicyDocument {
    pub fn new(statement: Vec<Statement>) -> Self {
        Self {
            version: "2012-10-17".to_owned(),
            statement,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    pub effect: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<String>,
    pub action: Vec<String>,
    pub resource: Vec<Expr>,
}

impl Statement {
    pub fn allow(actions: &[&str], resources: Vec<Expr>) -> Self {
        Self {
            effect: "Allow".to_owned(),
            principal: None,
            action: actions.iter().map(|a| (*a).to_owned()).collect(),
            resource: resources,
        }
    }

    pub fn for_principal(mut self, principal: &str) -> Self {
        self.principal = Some(principal.to_owned());
        self
    }
}

/// What a deployment step copies into its bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeploymentSource {
    /// Individual files, each placed at its key.
    Objects { objects: Vec<ObjectUpload> },
    /// A local zip whose contents are extracted into the bucket root.
    Archive { path: PathBuf },
}

/// Where the function code is read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionCode {
    pub bucket: Expr,
    pub key: String,
}

// ── Resources ──

/// Every resource type the provisioner emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceKind {
    Bucket {
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        force_destroy: bool,
        ownership: ObjectOwnership,
    },
    PublicAccessBlock {
        bucket: Expr,
        block: AccessBlock,
    },
    BucketPolicy {
        bucket: Expr,
        policy: PolicyDocument,
    },
    BucketCors {
        bucket: Expr,
        rules: Vec<CorsRule>,
    },
    WebsiteConfig {
        bucket: Expr,
        index_document: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_document: Option<String>,
    },
    BucketObject {
        bucket: Expr,
        key: String,
        source: PathBuf,
        #[serde(skip_serializing_if = "Option::is_none")]
        content_type: Option<String>,
    },
    BucketDeployment {
        bucket: Expr,
        source: DeploymentSource,
    },
    Role {
        assume_role_service: String,
        managed_policies: Vec<String>,
    },
    RolePolicy {
        role: Expr,
        policy: PolicyDocument,
    },
    Function {
        role: Expr,
        code: FunctionCode,
        runtime: String,
        handler: String,
        memory_mb: u32,
        timeout_secs: u32,
        environment: BTreeMap<String, Expr>,
    },
    FunctionUrl {
        function: Expr,
        auth_type: String,
        cors: CorsRule,
    },
    Permission {
        function: Expr,
        action: String,
        principal: String,
        source_arn: Expr,
    },
    HttpApi {
        name: String,
        cors: CorsRule,
    },
    Integration {
        api: Expr,
        integration_type: String,
        integration_uri: Expr,
        payload_format_version: String,
    },
    Route {
        api: Expr,
        route_key: String,
        target: Expr,
    },
    Stage {
        api: Expr,
        name: String,
        auto_deploy: bool,
    },
    DomainName {
        domain_name: String,
        certificate_arn: String,
        endpoint_type: String,
        security_policy: String,
    },
    ApiMapping {
        api: Expr,
        domain_name: Expr,
        stage: Expr,
    },
}

impl ResourceKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bucket { .. } => "bucket",
            Self::PublicAccessBlock { .. } => "public_access_block",
            Self::BucketPolicy { .. } => "bucket_policy",
            Self::BucketCors { .. } => "bucket_cors",
            Self::WebsiteConfig { .. } => "website_config",
            Self::BucketObject { .. } => "bucket_object",
            Self::BucketDeployment { .. } => "bucket_deployment",
            Self::Role { .. } => "role",
            Self::RolePolicy { .. } => "role_policy",
            Self::Function { .. } => "function",
            Self::FunctionUrl { .. } => "function_url",
            Self::Permission { .. } => "permission",
            Self::HttpApi { .. } => "http_api",
            Self::Integration { .. } => "integration",
            Self::Route { .. } => "route",
            Self::Stage { .. } => "stage",
            Self::DomainName { .. } => "domain_name",
            Self::ApiMapping { .. } => "api_mapping",
        }
    }

    /// Expressions whose references become implicit dependency edges.
    fn exprs(&self) -> Vec<&Expr> {
        match self {
            Self::Bucket { .. } | Self::Role { .. } | Self::HttpApi { .. } => vec![],
            Self::DomainName { .. } => vec![],
            Self::PublicAccessBlock { bucket, .. }
            | Self::BucketCors { bucket, .. }
            | Self::WebsiteConfig { bucket, .. }
            | Self::BucketObject { bucket, .. }
            | Self::BucketDeployment { bucket, .. } => vec![bucket],
            Self::BucketPolicy { bucket, policy } => {
                let mut exprs = vec![bucket];
                exprs.extend(policy.statement.iter().flat_map(|s| &s.resource));
                exprs
            }
            Self::RolePolicy { role, policy } => {
                let mut exprs = vec![role];
                exprs.extend(policy.statement.iter().flat_map(|s| &s.resource));
                exprs
            }
            Self::Function {
                role,
                code,
                environment,
                ..
            } => {
                let mut exprs = vec![role, &code.bucket];
                exprs.extend(environment.values());
                exprs
            }
            Self::FunctionUrl { function, .. } => vec![function],
            Self::Permission {
                function,
                source_arn,
                ..
            } => vec![function, source_arn],
            Self::Integration {
                api,
                integration_uri,
                ..
            } => vec![api, integration_uri],
            Self::Route { api, target, .. } => vec![api, target],
            Self::Stage { api, .. } => vec![api],
            Self::ApiMapping {
                api,
                domain_name,
                stage,
            } => vec![api, domain_name, stage],
        }
    }
}

/// One node of a [`ResourceGraph`](crate::graph::ResourceGraph).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    pub id: String,
    #[serde(flatten)]
    pub kind: ResourceKind,
}

impl Resource {
    pub fn new(id: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }

    /// Ids of the resources this one reads attributes from, deduplicated.
    pub fn references(&self) -> Vec<&str> {
        let mut refs: Vec<&str> = self
            .kind
            .exprs()
            .into_iter()
            .flat_map(Expr::references)
            .collect();
        refs.sort_unstable();
        refs.dedup();
        refs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concat_collects_nested_references() {
        let expr = Expr::concat([
            Expr::lit("https://"),
            Expr::attr("bucket", Attr::RegionalDomainName),
            Expr::concat([Expr::attr("api", Attr::Id)]),
        ]);
        assert_eq!(expr.references(), vec!["bucket", "api"]);
    }

    #[test]
    fn resource_references_are_deduplicated() {
        let resource = Resource::new(
            "policy",
            ResourceKind::BucketPolicy {
                bucket: Expr::attr("site", Attr::Id),
                policy: PolicyDocument::new(vec![Statement::allow(
                    &["s3:GetObject"],
                    vec![Expr::concat([Expr::attr("site", Attr::Arn), Expr::lit("/*")])],
                )]),
            },
        );
        assert_eq!(resource.references(), vec!["site"]);
    }

    #[test]
    fn serializes_with_type_tag_and_refs() {
        let resource = Resource::new(
            "cors",
            ResourceKind::BucketCors {
                bucket: Expr::attr("site", Attr::Id),
                rules: vec![CorsRule::bucket_writes()],
            },
        );
        let json = serde_json::to_value(&resource).unwrap();
        assert_eq!(json["id"], "cors");
        assert_eq!(json["type"], "bucket_cors");
        assert_eq!(json["bucket"]["ref"], "site");
        assert_eq!(json["bucket"]["attr"], "id");
        assert_eq!(json["rules"][0]["allowed_methods"][0], "PUT");
    }

    #[test]
    fn access_block_serializes_flags() {
        let resource = Resource::new(
            "block",
            ResourceKind::PublicAccessBlock {
                bucket: Expr::attr("site", Attr::Id),
                block: AccessBlock::BLOCK_ACLS,
            },
        );
        let json = serde_json::to_value(&resource).unwrap();
        assert_eq!(json["block"]["block_public_acls"], true);
        assert_eq!(json["block"]["block_public_policy"], false);
    }

    #[test]
    fn policy_document_uses_iam_casing() {
        let doc = PolicyDocument::new(vec![
            Statement::allow(&["s3:GetObject"], vec![Expr::lit("arn:aws:s3:::b/*")])
                .for_principal("*"),
        ]);
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["Version"], "2012-10-17");
        assert_eq!(json["Statement"][0]["Effect"], "Allow");
        assert_eq!(json["Statement"][0]["Principal"], "*");
        assert_eq!(json["Statement"][0]["Resource"][0], "arn:aws:s3:::b/*");
    }
}
