use crate::{
    compliance,
    config::Compliance,
    diagnostics::{note, DiagnosticSink},
    error::ExtractError,
    report::{sort_by_pct_desc, AnalyteResult, ExtractionMetadata, ExtractionResult, TestStatus},
    util::fixed4,
};
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, Default)]
struct Tally {
    pct: f64,
    mg_g: f64,
    has_mg_g: bool,
    seen: usize,
    printed_pct: Printed,
    printed_mg_g: Printed,
    detected: bool,
    retention_time: Mean,
    area: Mean,
    area_pct: Mean,
}

/// Mean over the replicates that reported a value at all.
#[derive(Debug, Default)]
struct Mean {
    sum: f64,
    n: usize,
}

impl Mean {
    fn add(&mut self, v: Option<f64>) {
        if let Some(v) = v {
            self.sum += v;
            self.n += 1;
        }
    }

    fn get(&self) -> Option<f64> {
        (self.n > 0).then(|| self.sum / self.n as f64)
    }
}

/// The value text as printed, while every replicate printed the same text.
#[derive(Debug, Default)]
enum Printed {
    #[default]
    Unseen,
    Same(Option<String>),
    Differs,
}

impl Printed {
    fn add(&mut self, v: Option<&str>) {
        *self = match std::mem::take(self) {
            Printed::Unseen => Printed::Same(v.map(str::to_string)),
            Printed::Same(p) if p.as_deref() == v => Printed::Same(p),
            _ => Printed::Differs,
        };
    }

    fn unanimous(self) -> Option<Option<String>> {
        match self {
            Printed::Same(p) => Some(p),
            _ => None,
        }
    }
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// Average analyte lists across `n` replicates. Concentrations are divided
/// by `n`, so a replicate that missed an analyte counts as zero; an analyte
/// survives only if some replicate detected it. Values printed identically
/// by all `n` replicates are kept as printed.
pub fn average_analytes<'a, I>(lists: I, n: usize) -> Vec<AnalyteResult>
where
    I: IntoIterator<Item = &'a [AnalyteResult]>,
{
    let mut order: Vec<String> = Vec::new();
    let mut tallies: HashMap<String, Tally> = HashMap::new();

    for list in lists {
        for it in list {
            let tally = tallies.entry(it.analyte.clone()).or_insert_with(|| {
                order.push(it.analyte.clone());
                Tally::default()
            });
            tally.pct += it.pct();
            tally.mg_g += it.mg_g();
            tally.has_mg_g |= it.result_mg_g.is_some();
            tally.seen += 1;
            tally.printed_pct.add(Some(&it.result_pct));
            tally.printed_mg_g.add(it.result_mg_g.as_deref());
            tally.detected |= it.detected;
            tally.retention_time.add(it.retention_time);
            tally.area.add(it.area);
            tally.area_pct.add(
                it.area_pct
                    .as_deref()
                    .map(crate::error::parse_or_zero),
            );
        }
    }

    let n = n.max(1);
    let mut out: Vec<AnalyteResult> = order
        .into_iter()
        .filter_map(|name| {
            let t = tallies.remove(&name)?;
            if !t.detected {
                return None;
            }
            // Every replicate printed the same value: keep the lab's text.
            let in_all = t.seen == n;
            let result_pct = t
                .printed_pct
                .unanimous()
                .flatten()
                .filter(|_| in_all)
                .unwrap_or_else(|| fixed4(t.pct / n as f64));
            let result_mg_g = match t.printed_mg_g.unanimous().filter(|_| in_all) {
                Some(printed) => printed,
                None => t.has_mg_g.then(|| fixed4(t.mg_g / n as f64)),
            };
            Some(AnalyteResult {
                analyte: name,
                result_pct,
                result_mg_g,
                detected: true,
                retention_time: t.retention_time.get().map(round3),
                area: t.area.get().map(round3),
                area_pct: t.area_pct.get().map(fixed4),
            })
        })
        .collect();
    sort_by_pct_desc(&mut out);
    out
}

/// Fail if any replicate failed, otherwise whatever the first one said.
fn pessimistic<F>(results: &[ExtractionResult], status: F) -> TestStatus
where
    F: Fn(&ExtractionResult) -> TestStatus,
{
    if results.iter().any(|r| status(r) == TestStatus::Fail) {
        TestStatus::Fail
    } else {
        results.first().map(&status).unwrap_or(TestStatus::NotTested)
    }
}

/// Combine replicate injections of one sample into a single result.
///
/// Document fields (lab, batch, date, signers, peaks) come from the first
/// replicate. Compliance is recomputed from the averaged cannabinoids.
pub fn average(
    results: &[ExtractionResult],
    cfg: &Compliance,
    sink: &dyn DiagnosticSink,
) -> Result<ExtractionResult, ExtractError> {
    let first = results.first().ok_or(ExtractError::NoDocuments)?;
    if results.len() == 1 {
        return Ok(first.clone());
    }
    let n = results.len();

    let cannabinoids = average_analytes(results.iter().map(|r| r.cannabinoids.as_slice()), n);
    let terpenes = results
        .iter()
        .any(|r| r.terpenes.is_some())
        .then(|| {
            average_analytes(
                results.iter().filter_map(|r| r.terpenes.as_deref()),
                n,
            )
        })
        .filter(|list| !list.is_empty());

    note(
        sink,
        "average",
        &format!("averaged {} analytes over {n} files", cannabinoids.len()),
    );
    let thc = compliance::calculate(cfg, &cannabinoids, sink);
    info!(
        files = n,
        analytes = cannabinoids.len(),
        total_thc = thc.calculated_total_thc,
        "averaged replicates"
    );

    Ok(ExtractionResult {
        format: first.format,
        lab_name: first.lab_name.clone(),
        analysis_date: first.analysis_date.clone(),
        batch_id: first.batch_id.clone(),
        cannabinoids,
        terpenes,
        heavy_metals_status: pessimistic(results, |r| r.heavy_metals_status),
        pesticides_status: pessimistic(results, |r| r.pesticides_status),
        residual_solvents_status: pessimistic(results, |r| r.residual_solvents_status),
        foreign_matter_status: pessimistic(results, |r| r.foreign_matter_status),
        terpenes_status: pessimistic(results, |r| r.terpenes_status),
        thc_compliance_flag: thc.is_compliant(),
        compliance_status: thc.status(),
        sample_info: first.sample_info.clone(),
        technicians: first.technicians.clone(),
        client_info: first.client_info.clone(),
        metadata: ExtractionMetadata {
            verification: thc.verification,
            calculated_total_thc: thc.calculated_total_thc,
            averaged_files: Some(n),
            ..first.metadata.clone()
        },
    })
}
