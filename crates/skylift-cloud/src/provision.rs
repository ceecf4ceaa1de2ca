//! Translates a resolved application into its resource graph.
//!
//! ```text
//! all modes   bucket ── access block ── policy ── cors
//!                                 │
//!             ssg/spa: website config + one object per file (after policy)
//!
//! ssr         artifact bucket ── role ── role policy
//!             assets deployment, artifact deployment
//!             function (after role policy, both deployments)
//!             function url, http api, permission, integration
//!             routes "ANY /" + "ANY /{proxy+}" ── $default stage
//!             [domain name ── api mapping]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use skylift_core::{
    App, AppTarget, BucketSpec, ComputeConfig, DomainSpec, ObjectUpload, RuntimeConfig,
    SkyliftConfig,
};

use crate::graph::{GraphError, ResourceGraph};
use crate::resource::{
    AccessBlock, Attr, CorsRule, DeploymentSource, Expr, FunctionCode, ObjectOwnership,
    PolicyDocument, Resource, ResourceKind, Statement,
};

/// Key the function code is read from inside the artifact bucket.
pub const ARTIFACT_KEY: &str = "build.zip";

/// The two route keys of every SSR api. Both target one integration.
pub const ROUTE_KEYS: [&str; 2] = ["ANY /", "ANY /{proxy+}"];

pub const DEFAULT_STAGE: &str = "$default";

const BASIC_EXECUTION_POLICY: &str =
    "arn:aws:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole";

/// Object-level permissions the function holds on its artifact bucket.
const ARTIFACT_ACTIONS: &[&str] = &[
    "s3:GetObject*",
    "s3:GetBucket*",
    "s3:List*",
    "s3:DeleteObject*",
    "s3:PutObject",
    "s3:PutObjectLegalHold",
    "s3:PutObjectRetention",
    "s3:PutObjectTagging",
    "s3:PutObjectVersionTagging",
    "s3:Abort*",
];

/// Ids of the resources making up one public bucket.
struct PublicBucket {
    bucket: String,
    policy: String,
}

/// Builds resource graphs; never applies them.
#[derive(Debug, Clone)]
pub struct Provisioner {
    compute: ComputeConfig,
    runtime: RuntimeConfig,
    region: String,
}

impl Provisioner {
    pub fn new(config: &SkyliftConfig) -> Self {
        Self {
            compute: config.compute.clone(),
            runtime: config.runtime.clone(),
            region: config.project.region.clone(),
        }
    }

    /// Build the graph for `app`.
    ///
    /// `uploads` are the files placed in the public bucket. `artifact` is the
    /// distribution archive of an SSR app (ignored for SSG/SPA).
    ///
    /// # Errors
    ///
    /// - [`ProvisionError::MissingArtifact`] for an SSR app whose archive is
    ///   absent or not a file
    /// - [`ProvisionError::MissingCertificate`] for a hostname without a
    ///   certificate
    pub fn provision(
        &self,
        app: &App,
        uploads: &[ObjectUpload],
        artifact: Option<&Path>,
    ) -> Result<ResourceGraph, ProvisionError> {
        let graph = match &app.target {
            AppTarget::Ssr {
                public_bucket,
                artifact_bucket,
                domain,
            } => {
                let artifact = match artifact {
                    Some(path) if path.is_file() => path,
                    other => {
                        return Err(ProvisionError::MissingArtifact {
                            app: app.name.clone(),
                            path: other.map(Path::to_path_buf),
                        });
                    }
                };
                let domain = domain.as_ref().map(certificate_for).transpose()?;
                self.server_rendered(app, public_bucket, artifact_bucket, domain, uploads, artifact)?
            }
            AppTarget::Ssg { site_bucket } => {
                self.static_site(app, site_bucket, Some("404.html"), uploads)?
            }
            AppTarget::Spa { site_bucket } => self.static_site(app, site_bucket, None, uploads)?,
        };

        tracing::info!(
            app = %app.name,
            mode = %app.mode(),
            resources = graph.len(),
            "resource graph built"
        );
        Ok(graph)
    }

    fn static_site(
        &self,
        app: &App,
        site: &BucketSpec,
        error_document: Option<&str>,
        uploads: &[ObjectUpload],
    ) -> Result<ResourceGraph, GraphError> {
        let mut graph = ResourceGraph::new();
        let bucket = public_bucket(&mut graph, site)?;

        let website = format!("{}-website", site.id);
        graph.add(Resource::new(
            &website,
            ResourceKind::WebsiteConfig {
                bucket: Expr::attr(&bucket.bucket, Attr::Id),
                index_document: "index.html".to_owned(),
                error_document: error_document.map(str::to_owned),
            },
        ))?;
        graph.depend(&website, &bucket.policy)?;

        for upload in uploads {
            let id = object_id(app, &upload.fingerprint);
            graph.add(Resource::new(
                &id,
                ResourceKind::BucketObject {
                    bucket: Expr::attr(&bucket.bucket, Attr::Id),
                    key: upload.key.clone(),
                    source: upload.source.clone(),
                    content_type: upload.content_type.clone(),
                },
            ))?;
            graph.depend(&id, &bucket.policy)?;
        }

        graph.output(
            "website_url",
            Expr::concat([
                Expr::lit("http://"),
                Expr::attr(&bucket.bucket, Attr::WebsiteEndpoint),
            ]),
        )?;
        graph.output(
            "public_hostname",
            Expr::attr(&bucket.bucket, Attr::RegionalDomainName),
        )?;
        graph.output("cdn_url", cdn_url(&bucket.bucket))?;
        Ok(graph)
    }

    fn server_rendered(
        &self,
        app: &App,
        public: &BucketSpec,
        artifact_bucket: &BucketSpec,
        domain: Option<(&str, &str)>,
        uploads: &[ObjectUpload],
        artifact: &Path,
    ) -> Result<ResourceGraph, GraphError> {
        let mut graph = ResourceGraph::new();
        let public_ids = public_bucket(&mut graph, public)?;

        // ── Artifact storage ──

        let artifacts = artifact_bucket.id.clone();
        graph.add(Resource::new(
            &artifacts,
            ResourceKind::Bucket {
                name: artifact_bucket.name.clone(),
                force_destroy: true,
                ownership: ObjectOwnership::BucketOwnerEnforced,
            },
        ))?;
        graph.add(Resource::new(
            format!("{artifacts}-access-block"),
            ResourceKind::PublicAccessBlock {
                bucket: Expr::attr(&artifacts, Attr::Id),
                block: AccessBlock::BLOCK_ALL,
            },
        ))?;

        let assets_deployment = resource_id(app, "assets-deployment");
        graph.add(Resource::new(
            &assets_deployment,
            ResourceKind::BucketDeployment {
                bucket: Expr::attr(&public_ids.bucket, Attr::Id),
                source: DeploymentSource::Objects {
                    objects: uploads.to_vec(),
                },
            },
        ))?;
        graph.depend(&assets_deployment, &public_ids.policy)?;
        graph.depend(&assets_deployment, &artifacts)?;

        let artifact_deployment = resource_id(app, "artifact-deployment");
        graph.add(Resource::new(
            &artifact_deployment,
            ResourceKind::BucketDeployment {
                bucket: Expr::attr(&artifacts, Attr::Id),
                source: DeploymentSource::Archive {
                    path: artifact.to_path_buf(),
                },
            },
        ))?;
        graph.depend(&artifact_deployment, &public_ids.bucket)?;

        // ── Execution role ──

        let role = resource_id(app, "role");
        graph.add(Resource::new(
            &role,
            ResourceKind::Role {
                assume_role_service: "lambda.amazonaws.com".to_owned(),
                managed_policies: vec![BASIC_EXECUTION_POLICY.to_owned()],
            },
        ))?;
        let role_policy = resource_id(app, "role-policy");
        graph.add(Resource::new(
            &role_policy,
            ResourceKind::RolePolicy {
                role: Expr::attr(&role, Attr::Name),
                policy: PolicyDocument::new(vec![Statement::allow(
                    ARTIFACT_ACTIONS,
                    vec![
                        Expr::attr(&artifacts, Attr::Arn),
                        Expr::concat([Expr::attr(&artifacts, Attr::Arn), Expr::lit("/*")]),
                    ],
                )]),
            },
        ))?;

        // ── Compute ──

        let function = resource_id(app, "function");
        graph.add(Resource::new(
            &function,
            ResourceKind::Function {
                role: Expr::attr(&role, Attr::Arn),
                code: FunctionCode {
                    bucket: Expr::attr(&artifacts, Attr::Id),
                    key: ARTIFACT_KEY.to_owned(),
                },
                runtime: self.compute.runtime.clone(),
                handler: self.compute.handler.clone(),
                memory_mb: self.compute.memory_mb,
                timeout_secs: self.compute.timeout_secs,
                environment: self.environment(app, &public_ids.bucket),
            },
        ))?;
        for dependency in [&role_policy, &assets_deployment, &artifact_deployment] {
            graph.depend(&function, dependency)?;
        }

        let function_url = resource_id(app, "function-url");
        graph.add(Resource::new(
            &function_url,
            ResourceKind::FunctionUrl {
                function: Expr::attr(&function, Attr::Name),
                auth_type: "NONE".to_owned(),
                cors: CorsRule::permissive(),
            },
        ))?;

        // ── Routing ──

        let api = resource_id(app, "api");
        graph.add(Resource::new(
            &api,
            ResourceKind::HttpApi {
                name: app.stack_name(),
                cors: CorsRule::permissive(),
            },
        ))?;
        graph.add(Resource::new(
            resource_id(app, "permission"),
            ResourceKind::Permission {
                function: Expr::attr(&function, Attr::Name),
                action: "lambda:InvokeFunction".to_owned(),
                principal: "apigateway.amazonaws.com".to_owned(),
                source_arn: Expr::concat([
                    Expr::attr(&api, Attr::ExecutionArn),
                    Expr::lit("/*/*"),
                ]),
            },
        ))?;

        let integration = resource_id(app, "integration");
        graph.add(Resource::new(
            &integration,
            ResourceKind::Integration {
                api: Expr::attr(&api, Attr::Id),
                integration_type: "AWS_PROXY".to_owned(),
                integration_uri: Expr::concat([
                    Expr::lit(format!(
                        "arn:aws:apigateway:{}:lambda:path/2015-03-31/functions/",
                        self.region
                    )),
                    Expr::attr(&function, Attr::Arn),
                    Expr::lit("/invocations"),
                ]),
                payload_format_version: "2.0".to_owned(),
            },
        ))?;

        let stage = resource_id(app, "stage");
        let mut routes = Vec::with_capacity(ROUTE_KEYS.len());
        for (suffix, route_key) in ["route-root", "route-proxy"].into_iter().zip(ROUTE_KEYS) {
            let route = resource_id(app, suffix);
            graph.add(Resource::new(
                &route,
                ResourceKind::Route {
                    api: Expr::attr(&api, Attr::Id),
                    route_key: route_key.to_owned(),
                    target: Expr::concat([
                        Expr::lit("integrations/"),
                        Expr::attr(&integration, Attr::Id),
                    ]),
                },
            ))?;
            routes.push(route);
        }
        graph.add(Resource::new(
            &stage,
            ResourceKind::Stage {
                api: Expr::attr(&api, Attr::Id),
                name: DEFAULT_STAGE.to_owned(),
                auto_deploy: true,
            },
        ))?;
        for route in &routes {
            graph.depend(&stage, route)?;
        }

        if let Some((hostname, certificate_arn)) = domain {
            let domain_name = resource_id(app, "domain");
            graph.add(Resource::new(
                &domain_name,
                ResourceKind::DomainName {
                    domain_name: hostname.to_owned(),
                    certificate_arn: certificate_arn.to_owned(),
                    endpoint_type: "REGIONAL".to_owned(),
                    security_policy: "TLS_1_2".to_owned(),
                },
            ))?;
            graph.add(Resource::new(
                resource_id(app, "api-mapping"),
                ResourceKind::ApiMapping {
                    api: Expr::attr(&api, Attr::Id),
                    domain_name: Expr::attr(&domain_name, Attr::Name),
                    stage: Expr::attr(&stage, Attr::Name),
                },
            ))?;
            graph.output("custom_url", Expr::lit(format!("https://{hostname}")))?;
            graph.output(
                "domain_target",
                Expr::attr(&domain_name, Attr::RegionalDomainNameTarget),
            )?;
        }

        graph.output("invoke_url", Expr::attr(&api, Attr::ApiEndpoint))?;
        graph.output("function_url", Expr::attr(&function_url, Attr::Url))?;
        graph.output(
            "public_hostname",
            Expr::attr(&public_ids.bucket, Attr::RegionalDomainName),
        )?;
        graph.output("cdn_url", cdn_url(&public_ids.bucket))?;
        Ok(graph)
    }

    /// Caller variables plus the injected CDN and FaaS variables.
    ///
    /// Injected names win; a caller variable with the same name is dropped.
    fn environment(&self, app: &App, public_bucket: &str) -> BTreeMap<String, Expr> {
        let mut env: BTreeMap<String, Expr> = app
            .env
            .iter()
            .map(|(key, value)| (key.to_owned(), Expr::lit(value)))
            .collect();

        let injected = self
            .runtime
            .cdn_vars
            .iter()
            .map(|name| (name, cdn_url(public_bucket)))
            .chain([(&self.runtime.faas_flag, Expr::lit("true"))]);
        for (name, value) in injected {
            if env.insert(name.clone(), value).is_some() {
                tracing::warn!(
                    app = %app.name,
                    variable = %name,
                    "application variable overridden by injected runtime variable"
                );
            }
        }
        env
    }
}

/// Public-read bucket with ACLs blocked, a read policy and write CORS.
fn public_bucket(graph: &mut ResourceGraph, bucket_spec: &BucketSpec) -> Result<PublicBucket, GraphError> {
    let bucket = bucket_spec.id.clone();
    graph.add(Resource::new(
        &bucket,
        ResourceKind::Bucket {
            name: bucket_spec.name.clone(),
            force_destroy: true,
            ownership: ObjectOwnership::BucketOwnerEnforced,
        },
    ))?;

    let access_block = format!("{bucket}-access-block");
    graph.add(Resource::new(
        &access_block,
        ResourceKind::PublicAccessBlock {
            bucket: Expr::attr(&bucket, Attr::Id),
            block: AccessBlock::BLOCK_ACLS,
        },
    ))?;

    let policy = format!("{bucket}-policy");
    graph.add(Resource::new(
        &policy,
        ResourceKind::BucketPolicy {
            bucket: Expr::attr(&bucket, Attr::Id),
            policy: PolicyDocument::new(vec![
                Statement::allow(
                    &["s3:GetObject"],
                    vec![Expr::concat([Expr::attr(&bucket, Attr::Arn), Expr::lit("/*")])],
                )
                .for_principal("*"),
            ]),
        },
    ))?;
    // A policy granting public read is rejected until the block allows it.
    graph.depend(&policy, &access_block)?;

    graph.add(Resource::new(
        format!("{bucket}-cors"),
        ResourceKind::BucketCors {
            bucket: Expr::attr(&bucket, Attr::Id),
            rules: vec![CorsRule::bucket_writes()],
        },
    ))?;

    Ok(PublicBucket { bucket, policy })
}

/// `https://<bucket>.s3.<region>.amazonaws.com`
fn cdn_url(bucket: &str) -> Expr {
    Expr::concat([
        Expr::lit("https://"),
        Expr::attr(bucket, Attr::RegionalDomainName),
    ])
}

fn resource_id(app: &App, part: &str) -> String {
    format!("{}-{part}-{}", app.name, app.environment)
}

/// `<app>-bucket-object-<env>-<fingerprint>`, stable while the path is unchanged.
fn object_id(app: &App, fingerprint: &str) -> String {
    format!("{}-bucket-object-{}-{fingerprint}", app.name, app.environment)
}

fn certificate_for(domain: &DomainSpec) -> Result<(&str, &str), ProvisionError> {
    match &domain.certificate_arn {
        Some(arn) => Ok((domain.hostname.as_str(), arn.as_str())),
        None => Err(ProvisionError::MissingCertificate {
            hostname: domain.hostname.clone(),
        }),
    }
}

fn describe_artifact(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" at {}", path.display()),
        None => String::new(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("no packaged archive for ssr app '{app}'{} — run `skylift package` first", describe_artifact(.path))]
    MissingArtifact { app: String, path: Option<PathBuf> },

    #[error("hostname '{hostname}' requires a certificate_arn")]
    MissingCertificate { hostname: String },

    #[error(transparent)]
    Graph(#[from] GraphError),
}
