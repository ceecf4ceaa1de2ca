/// File name of the generated entry point at the root of the bundle.
pub const ENTRY_FILE: &str = "index.js";

/// Module the entry point loads the production server from.
pub const SERVER_MODULE: &str = "./.production/server.js";

/// Generates the script that adapts the production HTTP server to a
/// function-as-a-service handler.
///
/// Output is a pure function of the shim package name, so repeated runs
/// produce byte-identical bundles.
pub struct EntryPointGenerator<'a> {
    shim_package: &'a str,
}

impl<'a> EntryPointGenerator<'a> {
    pub fn new(shim_package: &'a str) -> Self {
        Self { shim_package }
    }

    pub fn render(&self) -> String {
        format!(
            r#"const serverlessExpress = require("{shim}");
const {{ server }} = require("{server}").default;

server.less = true;

exports.handler = serverlessExpress({{ app: server, trimStageFromRequestPath: true }});
"#,
            shim = self.shim_package,
            server = SERVER_MODULE,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_shim_and_server() {
        let out = EntryPointGenerator::new("@vendia/serverless-express").render();
        assert!(out.starts_with("const serverlessExpress = require(\"@vendia/serverless-express\");"));
        assert!(out.contains("require(\"./.production/server.js\").default"));
    }

    #[test]
    fn flags_serverless_before_creating_handler() {
        let out = EntryPointGenerator::new("@vendia/serverless-express").render();
        let flag = out.find("server.less = true;").unwrap();
        let handler = out.find("exports.handler").unwrap();
        assert!(flag < handler);
        assert!(out.contains("trimStageFromRequestPath: true"));
    }

    #[test]
    fn render_is_deterministic() {
        let generator = EntryPointGenerator::new("shim");
        assert_eq!(generator.render(), generator.render());
    }
}
