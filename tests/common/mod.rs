//! # Shared Test Fixtures
//!
//! An in-memory [`ChartRenderer`] and helpers for laying out charts and test
//! files in scratch directories.

#![allow(dead_code)]

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use chartcheck::render::{
    Capabilities, Chart, ChartMetadata, ChartRenderer, Release, RenderError, RenderRequest,
    RenderedChart,
};
use serde_yaml::Value;

/// What the fake renderer was asked to render.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub metadata: ChartMetadata,
    pub release: Release,
    pub capabilities: Capabilities,
    pub values: Value,
    pub templates: Vec<String>,
}

type RenderFn = dyn Fn(&RenderRequest<'_>) -> Result<RenderedChart, RenderError>;

/// Renders with a closure and records every request.
pub struct FakeRenderer {
    render: Box<RenderFn>,
    pub requests: RefCell<Vec<RecordedRequest>>,
}

impl FakeRenderer {
    pub fn new(
        render: impl Fn(&RenderRequest<'_>) -> Result<RenderedChart, RenderError> + 'static,
    ) -> Self {
        Self {
            render: Box::new(render),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn last(&self) -> RecordedRequest {
        self.requests.borrow().last().cloned().expect("no render request recorded")
    }
}

impl ChartRenderer for FakeRenderer {
    fn render(&self, request: &RenderRequest<'_>) -> Result<RenderedChart, RenderError> {
        self.requests.borrow_mut().push(RecordedRequest {
            metadata: request.metadata.clone(),
            release: request.release.clone(),
            capabilities: request.capabilities.clone(),
            values: request.values.clone(),
            templates: request.templates.to_vec(),
        });
        (self.render)(request)
    }
}

pub fn yaml(src: &str) -> Value {
    serde_yaml::from_str(src).expect("fixture YAML")
}

/// A small chart: a deployment, a service, a configmap echoing the
/// capabilities and a notes template that renders nothing.
///
/// Setting the value `fail` makes rendering fail with that message.
pub fn basic_renderer() -> FakeRenderer {
    FakeRenderer::new(|req| {
        if let Some(message) = req.values.get("fail").and_then(Value::as_str) {
            return Err(RenderError::template(format!(
                "execution error at (basic/templates/deployment.yaml:1:1): {}",
                message
            )));
        }
        let replicas = req
            .values
            .get("replicaCount")
            .cloned()
            .unwrap_or(Value::from(1));
        let image = req
            .values
            .get("image")
            .and_then(|i| i.get("tag"))
            .and_then(Value::as_str)
            .unwrap_or("stable")
            .to_string();
        let name = format!("{}-{}", req.release.name, req.metadata.name);

        let mut deployment = yaml(&format!(
            "apiVersion: apps/v1
kind: Deployment
metadata:
  name: {name}
  namespace: {ns}
  labels:
    app: {chart}
    chart: {chart}-{version}
spec:
  template:
    spec:
      containers:
        - name: {chart}
          image: nginx:{image}
",
            name = name,
            ns = req.release.namespace,
            chart = req.metadata.name,
            version = req.metadata.version,
            image = image,
        ));
        deployment["spec"]["replicas"] = replicas;

        let service = yaml(&format!(
            "apiVersion: v1\nkind: Service\nmetadata:\n  name: {}\nspec:\n  ports:\n    - port: 80\n",
            name
        ));
        let mut config = yaml("apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: caps\n");
        config["data"] = yaml(&format!(
            "kubeVersion: v{}.{}\nrevision: '{}'\nupgrade: '{}'\n",
            req.capabilities.major_version,
            req.capabilities.minor_version,
            req.release.revision,
            req.release.upgrade
        ));
        config["data"]["apiVersions"] = Value::Sequence(
            req.capabilities
                .api_versions
                .iter()
                .map(|v| Value::from(v.as_str()))
                .collect(),
        );

        let all = [
            ("templates/deployment.yaml", vec![deployment]),
            ("templates/service.yaml", vec![service]),
            ("templates/configmap.yaml", vec![config]),
            ("templates/notes.yaml", Vec::new()),
        ];
        let mut chart = RenderedChart::new();
        for (template, documents) in all {
            if req.templates.is_empty() || req.templates.iter().any(|t| t == template) {
                chart.insert_template(template, documents);
            }
        }
        Ok(chart)
    })
}

pub fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().expect("parent dir")).expect("create dirs");
    std::fs::write(&path, content).expect("write fixture");
    path
}

/// Lays out `Chart.yaml` for chart `basic` under `root`.
pub fn basic_chart(root: &Path) -> Chart {
    write(
        root,
        "Chart.yaml",
        "apiVersion: v2\nname: basic\nversion: 0.1.0\nappVersion: \"1.0\"\n",
    );
    Chart::load(root).expect("basic chart")
}
