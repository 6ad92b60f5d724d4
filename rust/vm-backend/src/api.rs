//! HTTP request dispatcher.
//!
//! Requests are matched against [`API_SPEC`], an ordered table of endpoints.
//! The first endpoint whose path pattern matches and that declares a handler
//! for the request method serves it; anything else is answered with
//! `405 Method Not Allowed`.

use std::io;

use axum::{
    extract::State,
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};

use crate::error::{CloudError, CloudResult};
use crate::manager::Cloud;
use crate::vm::VmId;
use crate::AppState;

/// A single segment of an endpoint path pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// Matches exactly this text.
    Literal(&'static str),
    /// Matches any non-empty segment and captures it as the VM id.
    Id,
}

/// Handler invoked with the cloud and the captured id segment, if any.
type Handler = fn(&Cloud, Option<&str>) -> Response;

/// A single method served on an endpoint.
#[derive(Debug)]
pub struct MethodSpec {
    pub method: Method,
    /// What a successful response body holds, for the API summary.
    pub body_spec: &'static str,
    pub doc: &'static str,
    handler: Handler,
}

/// A path pattern and all the methods it serves.
#[derive(Debug)]
pub struct EndpointSpec {
    pub display_path: &'static str,
    pub segments: &'static [Segment],
    pub methods: &'static [MethodSpec],
}

impl EndpointSpec {
    /// Match a request path against this endpoint.
    ///
    /// Returns the captured id segment (`None` for id-less endpoints) when
    /// the path matches. Paths are anchored; one trailing slash is allowed.
    pub fn match_path<'a>(&self, path: &'a str) -> Option<Option<&'a str>> {
        let path = path.strip_prefix('/')?;
        let path = path.strip_suffix('/').unwrap_or(path);

        let mut parts = path.split('/');
        let mut captured = None;
        for segment in self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(text) if part == *text => {}
                Segment::Id if !part.is_empty() => captured = Some(part),
                _ => return None,
            }
        }
        if parts.next().is_some() {
            return None;
        }
        Some(captured)
    }
}

/// The served API, in match order.
pub static API_SPEC: &[EndpointSpec] = &[
    EndpointSpec {
        display_path: "/vms",
        segments: &[Segment::Literal("vms")],
        methods: &[MethodSpec {
            method: Method::GET,
            body_spec: "VMs JSON",
            doc: "list All VMs",
            handler: list,
        }],
    },
    EndpointSpec {
        display_path: "/vms/{vm_id}/launch",
        segments: &[Segment::Literal("vms"), Segment::Id, Segment::Literal("launch")],
        methods: &[MethodSpec {
            method: Method::PUT,
            body_spec: "",
            doc: "launch VM by id",
            handler: launch,
        }],
    },
    EndpointSpec {
        display_path: "/vms/{vm_id}/stop",
        segments: &[Segment::Literal("vms"), Segment::Id, Segment::Literal("stop")],
        methods: &[MethodSpec {
            method: Method::PUT,
            body_spec: "",
            doc: "stop VM by id",
            handler: stop,
        }],
    },
    EndpointSpec {
        display_path: "/vms/{vm_id}",
        segments: &[Segment::Literal("vms"), Segment::Id],
        methods: &[
            MethodSpec {
                method: Method::GET,
                body_spec: "VM JSON",
                doc: "inspect a VM by id",
                handler: inspect,
            },
            MethodSpec {
                method: Method::DELETE,
                body_spec: "",
                doc: "delete a VM by id",
                handler: delete,
            },
        ],
    },
];

/// Write a one-line-per-method summary of [`API_SPEC`].
pub fn write_api_doc(w: &mut impl io::Write) -> io::Result<()> {
    writeln!(w, "API:")?;
    for endpoint in API_SPEC {
        for m in endpoint.methods {
            let body_spec = if m.body_spec.is_empty() {
                "Check status code"
            } else {
                m.body_spec
            };
            writeln!(
                w,
                "{}\t{:<20}\t-> {:<20}\t# {}",
                m.method, endpoint.display_path, body_spec, m.doc
            )?;
        }
    }
    Ok(())
}

/// Route a request through [`API_SPEC`].
///
/// Mounted as the router fallback so that every path and method reaches it.
pub async fn dispatch(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    // Preflights are answered by the CORS layer; plain OPTIONS just succeed.
    if method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }

    let path = uri.path();
    tracing::info!("<- {} {}", method, path);

    for endpoint in API_SPEC {
        let Some(id_segment) = endpoint.match_path(path) else {
            continue;
        };
        if let Some(spec) = endpoint.methods.iter().find(|m| m.method == method) {
            return (spec.handler)(&state.cloud, id_segment);
        }
    }

    (
        StatusCode::METHOD_NOT_ALLOWED,
        format!("{method} {path} not allowed"),
    )
        .into_response()
}

// `str::parse` alone would also take a leading `+`.
fn parse_id(segment: Option<&str>) -> CloudResult<VmId> {
    let segment = segment.unwrap_or_default();
    let malformed = || CloudError::MalformedId {
        segment: segment.to_string(),
    };
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    segment.parse().ok().ok_or_else(malformed)
}

fn failure(status: StatusCode, err: &CloudError) -> Response {
    tracing::debug!(status = %status, error = %err, "Request failed");
    (status, err.to_string()).into_response()
}

/// Parse the id segment, answering `400 Bad Request` when it is malformed.
fn with_id(segment: Option<&str>, f: impl FnOnce(VmId) -> Response) -> Response {
    match parse_id(segment) {
        Ok(id) => f(id),
        Err(e) => failure(StatusCode::BAD_REQUEST, &e),
    }
}

fn list(cloud: &Cloud, _: Option<&str>) -> Response {
    Json(cloud.list()).into_response()
}

// Unknown ids answer 200 with an empty VM object, not 404.
fn inspect(cloud: &Cloud, segment: Option<&str>) -> Response {
    with_id(segment, |id| match cloud.inspect(id) {
        Some(vm) => Json(vm).into_response(),
        None => Json(serde_json::json!({})).into_response(),
    })
}

fn launch(cloud: &Cloud, segment: Option<&str>) -> Response {
    with_id(segment, |id| match cloud.launch(id) {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => failure(StatusCode::NOT_FOUND, &e),
    })
}

fn stop(cloud: &Cloud, segment: Option<&str>) -> Response {
    with_id(segment, |id| match cloud.stop(id) {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => failure(StatusCode::NOT_FOUND, &e),
    })
}

fn delete(cloud: &Cloud, segment: Option<&str>) -> Response {
    with_id(segment, |id| match cloud.delete(id) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => failure(StatusCode::NOT_ACCEPTABLE, &e),
    })
}
