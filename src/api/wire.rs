//! JSON bodies exchanged with the backend.

use crate::model::{CreatedOp, FailedPlan, RoundResult, Summary, WorkflowParameters};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(super) struct SearchRequest {
    pub data_planejamento: String,
    pub braco: u32,
    pub rodada_inicial: u32,
    pub rodada_final: u32,
}

impl From<&WorkflowParameters> for SearchRequest {
    fn from(p: &WorkflowParameters) -> Self {
        Self {
            data_planejamento: p.planning_date_str(),
            braco: p.branch(),
            rodada_inicial: p.start_round(),
            rodada_final: p.end_round(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct RoundRequest {
    pub data_planejamento: String,
    pub braco: u32,
    pub rodada: u32,
}

/// Common envelope; `sucesso` discriminates success inside HTTP 200 bodies.
#[derive(Debug, Deserialize)]
pub(super) struct Envelope {
    pub sucesso: bool,
    #[serde(default)]
    pub mensagem: Option<String>,
    #[serde(default)]
    pub erro: Option<String>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub ops_criadas: Option<u64>,
}

impl Envelope {
    pub fn error_text(&self) -> String {
        self.erro
            .clone()
            .unwrap_or_else(|| "backend reported a failure without details".into())
    }
}

impl From<Envelope> for RoundResult {
    fn from(e: Envelope) -> Self {
        let error = if e.sucesso { None } else { Some(e.error_text()) };
        RoundResult {
            success: e.sucesso,
            ops_created: e.ops_criadas.unwrap_or(0),
            message: e.mensagem.filter(|m| !m.is_empty()),
            error,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct SummaryBody {
    pub total_ops_criadas: u64,
    pub total_falhas: u64,
    #[serde(default)]
    pub ops_criadas_sucesso: Vec<CreatedEntry>,
    #[serde(default)]
    pub detalhes_falhas: Vec<FailureEntry>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreatedEntry {
    pub nuplan: i64,
    pub idiproc: i64,
}

#[derive(Debug, Deserialize)]
pub(super) struct FailureEntry {
    pub nuplan: i64,
    pub erro: String,
}

impl From<SummaryBody> for Summary {
    fn from(b: SummaryBody) -> Self {
        Summary {
            total_ops_created: b.total_ops_criadas,
            total_failures: b.total_falhas,
            success_list: b
                .ops_criadas_sucesso
                .into_iter()
                .map(|c| CreatedOp {
                    plan_id: c.nuplan,
                    created_op_id: c.idiproc,
                })
                .collect(),
            failure_list: b
                .detalhes_falhas
                .into_iter()
                .map(|f| FailedPlan {
                    plan_id: f.nuplan,
                    error: f.erro,
                })
                .collect(),
        }
    }
}
