//! Statistics reporter (component J): aggregates the visit table and
//! memo table from one simulation into a human-readable summary and a
//! machine-readable JSON object, mirroring `statistics.c`'s `printStats`.

use serde::Serialize;

use crate::config::{MemoEncoding, MemoMode};
use crate::memo::Memo;
use crate::program::Program;
use crate::simulate::SimulationRun;
use crate::visit_table::VisitTable;

#[derive(Debug, Serialize)]
pub struct InputInfo {
    #[serde(rename = "nStates")]
    pub n_states: usize,
    #[serde(rename = "lenW")]
    pub len_w: usize,
}

#[derive(Debug, Serialize)]
pub struct SimulationInfo {
    #[serde(rename = "nTotalVisits")]
    pub n_total_visits: u64,
    #[serde(rename = "nPossibleTotalVisitsWithMemoization")]
    pub n_possible_total_visits_with_memoization: u64,
    #[serde(rename = "visitsToMostVisitedSimPos")]
    pub visits_to_most_visited_sim_pos: u32,
    #[serde(rename = "visitsToMostVisitedVertex")]
    pub visits_to_most_visited_vertex: u32,
    #[serde(rename = "simTimeUS")]
    pub sim_time_us: u64,
}

#[derive(Debug, Serialize)]
pub struct MemoConfigInfo {
    #[serde(rename = "vertexSelection")]
    pub vertex_selection: String,
    pub encoding: String,
}

#[derive(Debug, Serialize)]
pub struct MemoResultsInfo {
    #[serde(rename = "nSelectedVertices")]
    pub n_selected_vertices: usize,
    #[serde(rename = "lenW")]
    pub len_w: usize,
    #[serde(rename = "maxObservedAsymptoticCostsPerMemoizedVertex")]
    pub max_observed_asymptotic_costs_per_memoized_vertex: Vec<usize>,
    #[serde(rename = "maxObservedMemoryBytesPerMemoizedVertex")]
    pub max_observed_memory_bytes_per_memoized_vertex: Vec<usize>,
}

#[derive(Debug, Serialize)]
pub struct MemoizationInfo {
    pub config: MemoConfigInfo,
    pub results: MemoResultsInfo,
}

#[derive(Debug, Serialize)]
pub struct StatsReport {
    #[serde(rename = "inputInfo")]
    pub input_info: InputInfo,
    #[serde(rename = "simulationInfo")]
    pub simulation_info: SimulationInfo,
    #[serde(rename = "memoizationInfo")]
    pub memoization_info: MemoizationInfo,
}

fn memo_mode_label(mode: MemoMode) -> &'static str {
    match mode {
        MemoMode::None => "NONE",
        MemoMode::Full => "ALL",
        MemoMode::InDegreeGt1 => "INDEG>1",
        MemoMode::LoopDest => "LOOP",
    }
}

fn memo_encoding_label(encoding: MemoEncoding) -> &'static str {
    match encoding {
        MemoEncoding::None => "NONE",
        MemoEncoding::Negative => "NEGATIVE",
        MemoEncoding::Rle => "RLE",
        MemoEncoding::RleTuned => "RLE_TUNED",
    }
}

/// Per-vertex visit sum, plus the single most-visited `(vertex, offset)`
/// search state and the single most-visited vertex overall.
struct VisitAggregate {
    visits_per_vertex: Vec<u64>,
    n_total_visits: u64,
    max_visits_per_sim_pos: u32,
    max_visits_per_vertex: u64,
}

fn aggregate_visits(visit_table: &VisitTable, n_states: usize, n_chars: usize) -> VisitAggregate {
    let mut visits_per_vertex = vec![0u64; n_states];
    let mut n_total_visits = 0u64;
    let mut max_visits_per_sim_pos = 0u32;

    for state in 0..n_states {
        for offset in 0..n_chars {
            let c = visit_table.count(state, offset);
            visits_per_vertex[state] += c as u64;
            n_total_visits += c as u64;
            max_visits_per_sim_pos = max_visits_per_sim_pos.max(c);
        }
    }

    let max_visits_per_vertex = visits_per_vertex.iter().copied().max().unwrap_or(0);

    VisitAggregate {
        visits_per_vertex,
        n_total_visits,
        max_visits_per_sim_pos,
        max_visits_per_vertex,
    }
}

/// Builds the machine-readable report from a finished simulation run.
pub fn build_report(program: &Program, run: &SimulationRun) -> StatsReport {
    let n_states = program.len();
    let n_chars = run.n_chars;
    let sim_time_us = run.elapsed.as_micros() as u64;
    let agg = aggregate_visits(&run.visit_table, n_states, n_chars);
    let memo = &run.memo;

    let (max_observed_asymptotic, max_observed_bytes) = match memo.effective_encoding() {
        MemoEncoding::None => {
            let cost = n_chars;
            let bytes = n_chars; // one bool per offset, `bool` sized generously at 1 byte
            (vec![cost; program.n_memoized_states], vec![bytes; program.n_memoized_states])
        }
        MemoEncoding::Negative => {
            let costs: Vec<usize> = program
                .instructions
                .iter()
                .filter(|i| i.memo_info.memo_state_num.is_some())
                .map(|i| agg.visits_per_vertex[i.state_num] as usize)
                .collect();
            let bytes = costs.iter().map(|&c| c * std::mem::size_of::<usize>() * 2).collect();
            (costs, bytes)
        }
        MemoEncoding::Rle | MemoEncoding::RleTuned => {
            let sizes = memo.rle_sizes();
            let costs = sizes.iter().map(|&(_, max_observed)| max_observed).collect();
            let bytes = sizes.iter().map(|&(_, max_observed)| max_observed * 16).collect();
            (costs, bytes)
        }
    };

    StatsReport {
        input_info: InputInfo { n_states, len_w: n_chars },
        simulation_info: SimulationInfo {
            n_total_visits: agg.n_total_visits,
            n_possible_total_visits_with_memoization: (n_states as u64) * (n_chars as u64),
            visits_to_most_visited_sim_pos: agg.max_visits_per_sim_pos,
            visits_to_most_visited_vertex: agg.max_visits_per_vertex as u32,
            sim_time_us,
        },
        memoization_info: MemoizationInfo {
            config: MemoConfigInfo {
                vertex_selection: memo_mode_label(program.memo_mode).to_string(),
                encoding: memo_encoding_label(memo.effective_encoding()).to_string(),
            },
            results: MemoResultsInfo {
                n_selected_vertices: program.n_memoized_states,
                len_w: n_chars,
                max_observed_asymptotic_costs_per_memoized_vertex: max_observed_asymptotic,
                max_observed_memory_bytes_per_memoized_vertex: max_observed_bytes,
            },
        },
    }
}

/// Human-readable rendering, in the register of stdout log lines like
/// `"STATS: Most-visited search state: ..."`.
pub fn human_summary(program: &Program, run: &SimulationRun) -> String {
    let report = build_report(program, run);
    let n_states = program.len();
    let agg = aggregate_visits(&run.visit_table, n_states, run.n_chars);
    let mut out = String::new();
    out.push_str(&format!(
        "STATS: {} states, |w| = {}\n",
        report.input_info.n_states, report.input_info.len_w
    ));
    out.push_str(&format!(
        "STATS: {} total visits, most-visited search state saw {} visits, most-visited vertex saw {} visits\n",
        report.simulation_info.n_total_visits,
        report.simulation_info.visits_to_most_visited_sim_pos,
        report.simulation_info.visits_to_most_visited_vertex,
    ));
    out.push_str(&format!(
        "STATS: memoization {} / {}, {} vertices selected, sim time {}us\n",
        report.memoization_info.config.vertex_selection,
        report.memoization_info.config.encoding,
        report.memoization_info.results.n_selected_vertices,
        report.simulation_info.sim_time_us,
    ));

    for (state, &visits) in agg.visits_per_vertex.iter().enumerate() {
        out.push_str(&format!("STATS: vertex {state} saw {visits} visits over all its search states\n"));
    }

    if matches!(run.memo.effective_encoding(), MemoEncoding::Rle | MemoEncoding::RleTuned) {
        for (state, (curr_size, max_observed_size)) in run.memo.rle_sizes().into_iter().enumerate() {
            out.push_str(&format!(
                "STATS: memo vector {state} has {curr_size} runs (max observed during execution: {max_observed_size})\n"
            ));
        }
    }

    out
}

/// Serializes the report to the exact JSON shape named by the
/// machine-readable channel.
pub fn to_json(program: &Program, run: &SimulationRun) -> serde_json::Result<String> {
    serde_json::to_string(&build_report(program, run))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Ast, AstKind, AstNode};
    use crate::compiler::compile;
    use crate::config::CompileConfig;
    use crate::simulate::backtrack;

    #[test]
    fn report_counts_total_visits_and_states() {
        let ast = Ast {
            root: AstNode::new(AstKind::Literal(b'a')),
            bol_anchor: false,
            eol_anchor: false,
            group_count: 0,
        };
        let prog = compile(&ast, &CompileConfig::default()).unwrap();
        let run = backtrack(&prog, b"a");
        let report = build_report(&prog, &run);
        assert_eq!(report.input_info.n_states, prog.len());
        assert!(report.simulation_info.n_total_visits > 0);
    }

    #[test]
    fn json_serializes_without_error() {
        let ast = Ast {
            root: AstNode::new(AstKind::Literal(b'a')),
            bol_anchor: false,
            eol_anchor: false,
            group_count: 0,
        };
        let prog = compile(&ast, &CompileConfig::default()).unwrap();
        let run = backtrack(&prog, b"a");
        let json = to_json(&prog, &run).unwrap();
        assert!(json.contains("inputInfo"));
        assert!(json.contains("memoizationInfo"));
    }
}
