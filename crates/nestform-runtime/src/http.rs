// Thin request router
// Maps list/create/edit/delete paths onto the workspace; no server here,
// callers hand in a Request and write out the Response.

use nestform_engine::PostedData;
use nestform_render::escape;
use nestform_types::RecordId;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::workspace::{SubmitOutcome, Workspace};
use crate::{Error, Result};

static MODEL_ROUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/(?P<action>new|edit|delete)/(?P<model>[A-Za-z_]+)/(?:(?P<id>\d+)/)?$").unwrap());
static LIST_ROUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/(?P<model>[A-Za-z_]+)/$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            other => Err(Error::InvalidOperation(format!(
                "Unsupported method: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub body: PostedData,
}

impl Request {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: PostedData::new(),
        }
    }

    pub fn post(path: impl Into<String>, body: PostedData) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Page { status: u16, body: String },
    Redirect { location: String },
    NotFound,
    ServerError { message: String },
}

impl Response {
    pub fn status(&self) -> u16 {
        match self {
            Response::Page { status, .. } => *status,
            Response::Redirect { .. } => 302,
            Response::NotFound => 404,
            Response::ServerError { .. } => 500,
        }
    }

    fn ok(body: String) -> Self {
        Response::Page { status: 200, body }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Route {
    Index,
    List { model: String },
    New { model: String },
    Edit { model: String, id: RecordId },
    Delete { model: String, id: RecordId },
}

impl Route {
    fn parse(path: &str) -> Option<Self> {
        if path == "/" {
            return Some(Route::Index);
        }

        if let Some(caps) = MODEL_ROUTE.captures(path) {
            let model = caps.name("model")?.as_str().to_string();
            let id = caps.name("id").and_then(|m| m.as_str().parse::<RecordId>().ok());
            return match (caps.name("action")?.as_str(), id) {
                ("new", None) => Some(Route::New { model }),
                ("edit", Some(id)) => Some(Route::Edit { model, id }),
                ("delete", Some(id)) => Some(Route::Delete { model, id }),
                _ => None,
            };
        }

        let caps = LIST_ROUTE.captures(path)?;
        Some(Route::List {
            model: caps.name("model")?.as_str().to_string(),
        })
    }
}

pub struct Router<'a> {
    workspace: &'a Workspace,
}

impl<'a> Router<'a> {
    pub fn new(workspace: &'a Workspace) -> Self {
        Self { workspace }
    }

    pub fn handle(&self, request: &Request) -> Response {
        let Some(route) = Route::parse(&request.path) else {
            tracing::debug!(path = %request.path, "no route");
            return Response::NotFound;
        };

        let result = match (request.method, route) {
            (Method::Get, Route::Index) => self.index(),
            (Method::Get, Route::List { model }) => self.list(&model),
            (Method::Get, Route::New { model }) => self.form(&model, None),
            (Method::Post, Route::New { model }) => self.submit(&model, None, &request.body),
            (Method::Get, Route::Edit { model, id }) => self.form(&model, Some(id)),
            (Method::Post, Route::Edit { model, id }) => {
                self.submit(&model, Some(id), &request.body)
            }
            (Method::Post, Route::Delete { model, id }) => self.delete(&model, id),
            _ => Ok(Response::NotFound),
        };

        let response = result.unwrap_or_else(|err| {
            if err.is_not_found() {
                Response::NotFound
            } else {
                tracing::error!(path = %request.path, error = %err, "request failed");
                Response::ServerError {
                    message: err.to_string(),
                }
            }
        });

        tracing::debug!(method = %request.method, path = %request.path, status = response.status(), "handled");
        response
    }

    fn index(&self) -> Result<Response> {
        let items: String = self
            .workspace
            .registry()
            .model_names()
            .iter()
            .map(|name| {
                format!(
                    r#"<li><a href="/{}/">{}</a></li>"#,
                    escape(&name.to_lowercase()),
                    escape(name)
                )
            })
            .collect();
        Ok(Response::ok(format!("<ul>{}</ul>", items)))
    }

    fn list(&self, model: &str) -> Result<Response> {
        let spec = self.workspace.spec(model)?;
        let slug = spec.model.name.to_lowercase();
        let label_field = spec.model.fields.first().map(|f| f.name.as_str());

        let items: String = self
            .workspace
            .list(model)?
            .iter()
            .filter_map(|instance| {
                let id = instance.id?;
                let label = label_field
                    .map(|f| instance.field(f).to_string())
                    .unwrap_or_default();
                Some(format!(
                    r#"<li><a href="/edit/{}/{}/">{}</a></li>"#,
                    slug,
                    id,
                    escape(&label)
                ))
            })
            .collect();

        Ok(Response::ok(format!(
            r#"<h1>{}</h1><ul>{}</ul><a href="/new/{}/">Add</a>"#,
            escape(&spec.model.name),
            items,
            slug
        )))
    }

    fn form(&self, model: &str, id: Option<RecordId>) -> Result<Response> {
        let node = self.workspace.display(model, id)?;
        let body = self.workspace.render_page(&node, &action_path(model, id))?;
        Ok(Response::ok(body))
    }

    fn submit(&self, model: &str, id: Option<RecordId>, body: &PostedData) -> Result<Response> {
        match self.workspace.submit(model, id, body)? {
            SubmitOutcome::Saved { instance, .. } => {
                let id = instance.id.ok_or_else(|| {
                    Error::InvalidOperation(format!("saved {} has no id", model))
                })?;
                Ok(Response::Redirect {
                    location: edit_path(model, id),
                })
            }
            SubmitOutcome::Invalid { node, .. } => {
                let body = self.workspace.render_page(&node, &action_path(model, id))?;
                Ok(Response::ok(body))
            }
        }
    }

    fn delete(&self, model: &str, id: RecordId) -> Result<Response> {
        let removed = self.workspace.delete(model, id)?;
        tracing::info!(model, id = %id, removed, "deleted via request");
        Ok(Response::Redirect {
            location: format!("/{}/", model.to_lowercase()),
        })
    }
}

/// Path of the edit page for a saved record.
pub fn edit_path(model: &str, id: RecordId) -> String {
    format!("/edit/{}/{}/", model.to_lowercase(), id)
}

/// Where a form for `model` posts: the edit page, or the create page for new records.
pub fn action_path(model: &str, id: Option<RecordId>) -> String {
    match id {
        Some(id) => edit_path(model, id),
        None => format!("/new/{}/", model.to_lowercase()),
    }
}
