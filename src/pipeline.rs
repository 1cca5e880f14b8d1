use crate::{
    average,
    compliance::{self, AncillaryStatuses},
    config::Config,
    decode::{chromatography::{self, PeakRules}, potency},
    diagnostics::{note, DiagnosticSink},
    error::ExtractError,
    format::{self, DocumentFormat},
    metadata,
    report::{AnalyteResult, ExtractionMetadata, ExtractionResult},
    section::{self, EndMarkers, Section, TableKind},
    text::{normalize_line, prepare_document, reconstruct_rows},
    vocabulary::AnalyteValidator,
};
use anyhow::{Context, Result};
use tracing::{debug, info, warn};

pub struct Pipeline<S: DiagnosticSink> {
    cfg: Config,
    sink: S,
    potency: AnalyteValidator,
    terpenes: AnalyteValidator,
    end_markers: EndMarkers,
    peak_rules: PeakRules,
}

impl<S: DiagnosticSink> Pipeline<S> {
    pub fn new(cfg: &Config, sink: S) -> Result<Self> {
        let peak_rules = PeakRules::new(&cfg.chromatography).with_context(|| {
            format!(
                "compiling chromatography.boilerplate_name_pattern {:?}",
                cfg.chromatography.boilerplate_name_pattern
            )
        })?;
        Ok(Self {
            cfg: cfg.clone(),
            sink,
            potency: AnalyteValidator::cannabinoids(),
            terpenes: AnalyteValidator::terpenes(),
            end_markers: EndMarkers::new(&cfg.tabular.extra_end_markers),
            peak_rules,
        })
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Extract one document. Never fails: anything that cannot be read is
    /// left empty and recorded on the sink.
    pub fn extract(&self, raw: &str) -> ExtractionResult {
        let text = prepare_document(&self.cfg.normalize, raw);
        let format = format::detect(&text);
        note(&self.sink, "format", &format!("detected {format:?}"));

        let result = match format {
            DocumentFormat::TabularPotency => self.extract_tabular(&text),
            DocumentFormat::ChromatographyIntegration => self.extract_chromatography(&text),
        };

        info!(
            format = ?result.format,
            batch = %result.batch_id,
            analytes = result.cannabinoids.len(),
            total_thc = result.metadata.calculated_total_thc,
            verification = ?result.metadata.verification,
            "extracted document"
        );
        result
    }

    /// Extract each replicate and average them. A single text is returned
    /// as extracted.
    pub fn extract_replicates<T: AsRef<str>>(
        &self,
        texts: &[T],
    ) -> Result<ExtractionResult, ExtractError> {
        if texts.is_empty() {
            return Err(ExtractError::NoDocuments);
        }
        let results: Vec<ExtractionResult> =
            texts.iter().map(|t| self.extract(t.as_ref())).collect();
        average::average(&results, &self.cfg.compliance, &self.sink)
    }

    /// Table bounds for every table kind the document format can carry.
    pub fn locate_tables(&self, raw: &str) -> Vec<(TableKind, Result<Section, ExtractError>)> {
        let text = prepare_document(&self.cfg.normalize, raw);
        let lines: Vec<&str> = text.lines().collect();
        let kinds: &[TableKind] = match format::detect(&text) {
            DocumentFormat::TabularPotency => &[TableKind::Potency, TableKind::Terpenes],
            DocumentFormat::ChromatographyIntegration => &[TableKind::Chromatography],
        };
        kinds
            .iter()
            .map(|kind| (*kind, section::locate(&lines, *kind, &self.end_markers)))
            .collect()
    }

    fn locate(&self, lines: &[&str], kind: TableKind) -> Option<Section> {
        match section::locate(lines, kind, &self.end_markers) {
            Ok(found) => {
                debug!(table = %kind, start = found.start, end = found.end, "located table");
                Some(found)
            }
            Err(err) => {
                if kind != TableKind::Terpenes {
                    warn!("{err}");
                }
                note(&self.sink, "section", &err.to_string());
                None
            }
        }
    }

    fn table(
        &self,
        lines: &[&str],
        kind: TableKind,
        validator: &AnalyteValidator,
    ) -> Option<Vec<AnalyteResult>> {
        let found = self.locate(lines, kind)?;
        // Title and column-header lines carry no numbers, so left in place
        // they would capture the values of a wrapped row below them.
        let body: Vec<&str> = found
            .lines(lines)
            .into_iter()
            .filter(|l| {
                let line = normalize_line(l);
                !section::is_table_title(&line) && !potency::is_header_line(&line)
            })
            .collect();
        let rows = reconstruct_rows(&body, &self.cfg.tabular);
        for row in &rows {
            note(&self.sink, "rows", row);
        }
        Some(potency::extract_table(&rows, validator, &self.sink))
    }

    fn extract_tabular(&self, text: &str) -> ExtractionResult {
        let lines: Vec<&str> = text.lines().collect();

        let cannabinoids = self
            .table(&lines, TableKind::Potency, &self.potency)
            .unwrap_or_default();
        let terpenes = self
            .table(&lines, TableKind::Terpenes, &self.terpenes)
            .filter(|list| !list.is_empty());

        let statuses = AncillaryStatuses::from_text(text);
        let thc = compliance::calculate(&self.cfg.compliance, &cannabinoids, &self.sink);

        ExtractionResult {
            format: DocumentFormat::TabularPotency,
            lab_name: metadata::lab_name(text, &self.cfg.tabular),
            analysis_date: metadata::analysis_date(text),
            batch_id: metadata::batch_id(text),
            cannabinoids,
            terpenes,
            heavy_metals_status: statuses.heavy_metals,
            pesticides_status: statuses.pesticides,
            residual_solvents_status: statuses.residual_solvents,
            foreign_matter_status: statuses.foreign_matter,
            terpenes_status: statuses.terpenes,
            thc_compliance_flag: thc.is_compliant(),
            compliance_status: thc.status(),
            sample_info: metadata::sample_info(text),
            technicians: metadata::technicians(&lines),
            client_info: metadata::client_info(&lines),
            metadata: ExtractionMetadata {
                verification: thc.verification,
                calculated_total_thc: thc.calculated_total_thc,
                injection_details: None,
                peaks: Vec::new(),
                total_area: None,
                averaged_files: None,
            },
        }
    }

    fn extract_chromatography(&self, text: &str) -> ExtractionResult {
        let lines: Vec<&str> = text.lines().collect();

        let found = self.locate(&lines, TableKind::Chromatography);
        let table =
            chromatography::extract_table(&lines, found.as_ref(), &self.peak_rules, &self.sink);
        if table.analytes.is_empty() {
            warn!("no quantified peaks decoded");
        }

        let injection = metadata::injection_details(text);
        note(&self.sink, "injection", &format!("{injection:?}"));

        let statuses = AncillaryStatuses::from_text(text);
        let thc = compliance::calculate(&self.cfg.compliance, &table.analytes, &self.sink);

        ExtractionResult {
            format: DocumentFormat::ChromatographyIntegration,
            lab_name: self.cfg.chromatography.lab_name.clone(),
            analysis_date: injection.injection_datetime.clone(),
            batch_id: injection.injection_name.clone().unwrap_or_default(),
            cannabinoids: table.analytes,
            terpenes: None,
            heavy_metals_status: statuses.heavy_metals,
            pesticides_status: statuses.pesticides,
            residual_solvents_status: statuses.residual_solvents,
            foreign_matter_status: statuses.foreign_matter,
            terpenes_status: statuses.terpenes,
            thc_compliance_flag: thc.is_compliant(),
            compliance_status: thc.status(),
            sample_info: None,
            technicians: Vec::new(),
            client_info: None,
            metadata: ExtractionMetadata {
                verification: thc.verification,
                calculated_total_thc: thc.calculated_total_thc,
                injection_details: Some(injection),
                peaks: table.peaks,
                total_area: table.total_area,
                averaged_files: None,
            },
        }
    }
}
