use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::ServiceError;
use crate::graph::graph_query::{ActionDetail, ArrivalScene, GraphQuery, SceneDetail};
use crate::index::{identity::NodeId, record::Bounds};

const SCENE_DETAILS: &str = "UNWIND $ids AS id \
     MATCH (s:Scene {hash_id: id}) \
     RETURN s.hash_id, s.name, s.description";

const ACTION_DETAILS: &str = "UNWIND $ids AS id \
     MATCH (a:Action {hash_id: id}) \
     RETURN a.hash_id, a.name, a.description, a.bounds, a.resource_id";

const OUTGOING_ACTIONS: &str = "MATCH (s:Scene {hash_id: $id})-[:LEADS_TO]->(a:Action) \
     RETURN a.hash_id";

const ARRIVAL_SCENE: &str = "MATCH (a:Action {hash_id: $id})-[:LEADS_TO]->(s:Scene) \
     RETURN s.hash_id, s.name, s.description LIMIT 1";

/// Graph backend speaking the Neo4j HTTP transactional API.
pub struct Neo4jGraph {
    commit_url: String,
    user: String,
    password: Option<String>,
    http: HttpClient,
}

#[derive(Serialize)]
struct TxRequest<'a> {
    statements: [Statement<'a>; 1],
}

#[derive(Serialize)]
struct Statement<'a> {
    statement: &'a str,
    parameters: Value,
}

#[derive(Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Deserialize)]
struct TxResult {
    #[serde(default)]
    data: Vec<TxRow>,
}

#[derive(Deserialize)]
struct TxRow {
    row: Vec<Value>,
}

#[derive(Deserialize)]
struct TxError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl Neo4jGraph {
    /// `uri` is the HTTP base, e.g. `http://localhost:7474`.
    pub fn new(
        uri: &str,
        database: &str,
        user: &str,
        password: Option<String>,
    ) -> Result<Self, ServiceError> {
        let commit_url = format!("{}/db/{}/tx/commit", uri.trim_end_matches('/'), database);
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|source| ServiceError::Http {
                endpoint: commit_url.clone(),
                source,
            })?;
        Ok(Self {
            commit_url,
            user: user.to_string(),
            password,
            http,
        })
    }

    /// Run one Cypher statement and return its rows.
    fn run(&self, statement: &str, parameters: Value) -> Result<Vec<Vec<Value>>, ServiceError> {
        let body = TxRequest {
            statements: [Statement {
                statement,
                parameters,
            }],
        };

        let response = self
            .http
            .post(&self.commit_url)
            .basic_auth(&self.user, self.password.as_deref())
            .json(&body)
            .send()
            .map_err(|source| ServiceError::Http {
                endpoint: self.commit_url.clone(),
                source,
            })?;

        let status = response.status();
        let text = response.text().map_err(|source| ServiceError::Http {
            endpoint: self.commit_url.clone(),
            source,
        })?;
        if !status.is_success() {
            return Err(ServiceError::Status {
                endpoint: self.commit_url.clone(),
                status: status.as_u16(),
                body: text,
            });
        }

        parse_rows(&text)
    }

    fn rows_or_empty(&self, what: &str, statement: &str, parameters: Value) -> Vec<Vec<Value>> {
        match self.run(statement, parameters) {
            Ok(rows) => {
                debug!(rows = rows.len(), "{} lookup", what);
                rows
            }
            Err(e) => {
                warn!("{} lookup failed, treating as empty: {}", what, e);
                Vec::new()
            }
        }
    }
}

/// Decode a transactional-endpoint response body into rows.
pub fn parse_rows(body: &str) -> Result<Vec<Vec<Value>>, ServiceError> {
    let parsed: TxResponse = serde_json::from_str(body).map_err(|source| ServiceError::Decode {
        context: "neo4j transaction response".into(),
        source,
    })?;
    if let Some(err) = parsed.errors.first() {
        return Err(ServiceError::Shape(format!("{}: {}", err.code, err.message)));
    }
    Ok(parsed
        .results
        .into_iter()
        .flat_map(|r| r.data.into_iter().map(|d| d.row))
        .collect())
}

fn text_at(row: &[Value], i: usize) -> Option<String> {
    row.get(i).and_then(Value::as_str).map(str::to_string)
}

/// Bounds are stored as JSON text on the node.
pub fn decode_bounds(raw: Option<&Value>) -> Option<Bounds> {
    match raw? {
        Value::String(s) => serde_json::from_str(s).ok(),
        other => serde_json::from_value(other.clone()).ok(),
    }
}

fn id_params(ids: &[NodeId]) -> Value {
    json!({ "ids": ids.iter().map(NodeId::as_str).collect::<Vec<_>>() })
}

impl GraphQuery for Neo4jGraph {
    fn details_for_scenes(&self, ids: &[NodeId]) -> HashMap<NodeId, SceneDetail> {
        if ids.is_empty() {
            return HashMap::new();
        }
        self.rows_or_empty("scene detail", SCENE_DETAILS, id_params(ids))
            .into_iter()
            .filter_map(|row| {
                let id = text_at(&row, 0)?;
                Some((
                    NodeId::new(id),
                    SceneDetail {
                        name: text_at(&row, 1).unwrap_or_default(),
                        description: text_at(&row, 2).unwrap_or_default(),
                    },
                ))
            })
            .collect()
    }

    fn details_for_actions(&self, ids: &[NodeId]) -> HashMap<NodeId, ActionDetail> {
        if ids.is_empty() {
            return HashMap::new();
        }
        self.rows_or_empty("action detail", ACTION_DETAILS, id_params(ids))
            .into_iter()
            .filter_map(|row| {
                let id = text_at(&row, 0)?;
                Some((
                    NodeId::new(id),
                    ActionDetail {
                        name: text_at(&row, 1).unwrap_or_default(),
                        description: text_at(&row, 2).unwrap_or_default(),
                        bounds: decode_bounds(row.get(3)),
                        resource_id: text_at(&row, 4),
                    },
                ))
            })
            .collect()
    }

    fn outgoing_actions(&self, scene: &NodeId) -> Vec<NodeId> {
        self.rows_or_empty(
            "outgoing action",
            OUTGOING_ACTIONS,
            json!({ "id": scene.as_str() }),
        )
        .into_iter()
        .filter_map(|row| text_at(&row, 0).map(NodeId::new))
        .collect()
    }

    fn arrival_scene(&self, action: &NodeId) -> Option<ArrivalScene> {
        let row = self
            .rows_or_empty("arrival scene", ARRIVAL_SCENE, json!({ "id": action.as_str() }))
            .into_iter()
            .next()?;
        Some(ArrivalScene {
            identity: NodeId::new(text_at(&row, 0)?),
            name: text_at(&row, 1).unwrap_or_default(),
            description: text_at(&row, 2).unwrap_or_default(),
        })
    }
}
