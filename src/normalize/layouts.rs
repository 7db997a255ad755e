//! Per-variant layout rules: where the header is, how labels map onto the
//! canonical vocabulary and which columns fold together.

use std::path::Path;

use tracing::{debug, warn};

use super::era::FormatEra;
use super::header::{header_offset, HeaderRule};
use super::merge::{merge_descriptive_columns, ColumnRef, MergeSpec};
use super::rename::{rename_label, ColumnRule, Renamed};
use super::Table;
use crate::dataset::Variant;
use crate::error::{Error, Result};
use crate::partition::PartitionKey;
use crate::sheet::RawSheet;

pub const NATUREZA: &str = "Natureza";

/// How parsed header labels become canonical ones.
#[derive(Debug, Clone, Copy)]
pub enum Labels {
    /// Ordered keyword rules, first match wins.
    Keywords(&'static [ColumnRule]),
    /// Positional names; the file must have exactly this many columns.
    Literal(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct Layout {
    pub header: HeaderRule,
    pub labels: Labels,
    pub merge: Option<MergeSpec>,
    /// Output columns, in output order.
    pub canonical: &'static [&'static str],
}

// ─── expenditure ────────────────────────────────────────────────────

pub const DESPESA_SENTINEL: &str = "Unidade Administrativa";

const DESPESA_RULES: &[ColumnRule] = &[
    ColumnRule::starts_with(&["unidade"], "Unidade Administrativa"),
    ColumnRule::contains(&["subfunção", "subfuncao"], "Subfunção"),
    ColumnRule::starts_with(&["função", "funcao"], "Função"),
    ColumnRule::starts_with(&["programa"], "Programa"),
    ColumnRule::contains(&["dotação inicial", "dotacao inicial"], "Dotação Inicial"),
    ColumnRule::contains(&["dotação atualizada", "dotacao atualizada"], "Dotação Atualizada"),
    ColumnRule::starts_with(&["ação", "acao", "projeto/atividade"], "Ação"),
    ColumnRule::contains(&["elemento"], "Elemento de Despesa"),
    ColumnRule::contains(&["fonte"], "Fonte de Recurso"),
    ColumnRule::contains(&["empenhad"], "Empenhado"),
    ColumnRule::contains(&["liquidad"], "Liquidado"),
    ColumnRule::contains(&["pago"], "Pago"),
];

pub const DESPESA: Layout = Layout {
    header: HeaderRule::Sentinel(DESPESA_SENTINEL),
    labels: Labels::Keywords(DESPESA_RULES),
    merge: None,
    canonical: &[
        "Unidade Administrativa",
        "Função",
        "Subfunção",
        "Programa",
        "Ação",
        "Elemento de Despesa",
        "Fonte de Recurso",
        "Dotação Inicial",
        "Dotação Atualizada",
        "Empenhado",
        "Liquidado",
        "Pago",
    ],
};

// ─── revenue forecast ───────────────────────────────────────────────

const PREVISTA_RULES: &[ColumnRule] = &[
    ColumnRule::starts_with(&["jan"], "Janeiro"),
    ColumnRule::starts_with(&["fev"], "Fevereiro"),
    ColumnRule::starts_with(&["mar"], "Março"),
    ColumnRule::starts_with(&["abr"], "Abril"),
    ColumnRule::starts_with(&["mai"], "Maio"),
    ColumnRule::starts_with(&["jun"], "Junho"),
    ColumnRule::starts_with(&["jul"], "Julho"),
    ColumnRule::starts_with(&["ago"], "Agosto"),
    ColumnRule::starts_with(&["set"], "Setembro"),
    ColumnRule::starts_with(&["out"], "Outubro"),
    ColumnRule::starts_with(&["nov"], "Novembro"),
    ColumnRule::starts_with(&["dez"], "Dezembro"),
    ColumnRule::starts_with(&["total"], "Total"),
];

const CODE_DESCRIPTION_BY_POSITION: MergeSpec = MergeSpec {
    code: ColumnRef::Index(0),
    description: ColumnRef::Index(1),
    into: NATUREZA,
};

pub const RECEITA_PREVISTA: Layout = Layout {
    header: HeaderRule::Fixed(2),
    labels: Labels::Keywords(PREVISTA_RULES),
    merge: Some(CODE_DESCRIPTION_BY_POSITION),
    canonical: &[
        NATUREZA,
        "Janeiro",
        "Fevereiro",
        "Março",
        "Abril",
        "Maio",
        "Junho",
        "Julho",
        "Agosto",
        "Setembro",
        "Outubro",
        "Novembro",
        "Dezembro",
        "Total",
    ],
};

// ─── revenue comparison ─────────────────────────────────────────────

const COMPARATIVA_COLUMNS: &[&str] = &[
    NATUREZA,
    "Previsão Inicial",
    "Previsão Atualizada",
    "Arrecadado no Mês",
    "Arrecadado até o Mês",
    "Diferença",
];

const COMPARATIVA_RULES: &[ColumnRule] = &[
    ColumnRule::contains(&["previsão inicial", "previsao inicial"], "Previsão Inicial"),
    ColumnRule::contains(
        &["previsão atualizada", "previsao atualizada"],
        "Previsão Atualizada",
    ),
    ColumnRule::contains(
        &["até o mês", "ate o mes", "até o mes", "acumulad"],
        "Arrecadado até o Mês",
    ),
    ColumnRule::contains(&["no mês", "no mes"], "Arrecadado no Mês"),
    ColumnRule::contains(&["diferença", "diferenca", "saldo"], "Diferença"),
];

pub const RECEITA_COMPARATIVA_PRE: Layout = Layout {
    header: HeaderRule::Fixed(1),
    labels: Labels::Keywords(COMPARATIVA_RULES),
    merge: Some(CODE_DESCRIPTION_BY_POSITION),
    canonical: COMPARATIVA_COLUMNS,
};

pub const RECEITA_COMPARATIVA_POST: Layout = Layout {
    header: HeaderRule::Fixed(5),
    labels: Labels::Literal(&[
        "Código",
        "Descrição",
        "Previsão Inicial",
        "Previsão Atualizada",
        "Arrecadado no Mês",
        "Arrecadado até o Mês",
        "Diferença",
    ]),
    merge: Some(MergeSpec {
        code: ColumnRef::Name("Código"),
        description: ColumnRef::Name("Descrição"),
        into: NATUREZA,
    }),
    canonical: COMPARATIVA_COLUMNS,
};

pub fn comparativa(era: FormatEra) -> &'static Layout {
    match era {
        FormatEra::Pre2505 => &RECEITA_COMPARATIVA_PRE,
        FormatEra::Post2505 => &RECEITA_COMPARATIVA_POST,
    }
}

/// Layout for a raw file of `variant`. Comparative files pick their era from
/// the partition key in the file name.
pub fn layout_for(variant: Variant, path: &Path) -> Result<&'static Layout> {
    Ok(match variant {
        Variant::DespesaMensalConsolidada => &DESPESA,
        Variant::ReceitaMensalPrevista => &RECEITA_PREVISTA,
        Variant::ReceitaMensalComparativa => {
            let key = PartitionKey::from_path(path)?;
            let era = FormatEra::for_key(&key);
            debug!(file = %path.display(), %key, %era, "comparative layout");
            comparativa(era)
        }
    })
}

impl Layout {
    /// Parse `sheet` into canonical columns, without provenance.
    pub fn apply(&self, sheet: &RawSheet) -> Result<Table> {
        let offset = header_offset(sheet, self.header)?;
        debug!(file = %sheet.path().display(), offset, "header located");
        let mut table = sheet.parse_rows(offset)?;

        if let Labels::Literal(names) = self.labels {
            if table.columns.len() != names.len() {
                return Err(Error::ColumnCountMismatch {
                    file: sheet.path().to_path_buf(),
                    expected: names.len(),
                    found: table.columns.len(),
                });
            }
            table.columns = names.iter().map(|n| n.to_string()).collect();
        }

        if let Some(spec) = &self.merge {
            table = merge_descriptive_columns(table, spec)?;
        }

        let renamed: Vec<Renamed> = table
            .columns
            .iter()
            .map(|label| self.rename(label))
            .collect();

        Ok(self.project(table, &renamed, sheet.path()))
    }

    fn rename(&self, label: &str) -> Renamed {
        // labels produced by a merge or a literal layout are already canonical
        if let Some(canonical) = self.canonical.iter().copied().find(|c| *c == label) {
            return Renamed::Matched {
                original: label.to_string(),
                canonical,
            };
        }
        match self.labels {
            Labels::Keywords(rules) => rename_label(label, rules),
            Labels::Literal(_) => Renamed::Unmatched(label.to_string()),
        }
    }

    /// Canonical columns present, in canonical order, then unmatched ones in
    /// source order. A second column claiming an already-taken canonical name is
    /// kept under its original label.
    fn project(&self, table: Table, renamed: &[Renamed], file: &Path) -> Table {
        let mut used = vec![false; renamed.len()];
        let mut picks: Vec<(usize, String)> = Vec::with_capacity(renamed.len());

        for want in self.canonical {
            let hit = renamed.iter().enumerate().position(|(i, r)| {
                !used[i] && matches!(r, Renamed::Matched { canonical, .. } if canonical == want)
            });
            match hit {
                Some(i) => {
                    used[i] = true;
                    picks.push((i, want.to_string()));
                }
                None => warn!(file = %file.display(), column = want, "canonical column missing"),
            }
        }

        for (i, r) in renamed.iter().enumerate() {
            if used[i] {
                continue;
            }
            warn!(file = %file.display(), column = r.original(), "unmatched column kept as-is");
            picks.push((i, r.original().to_string()));
        }

        let columns = picks.iter().map(|(_, name)| name.clone()).collect();
        let rows = table
            .rows
            .iter()
            .map(|row| {
                picks
                    .iter()
                    .map(|(i, _)| row.get(*i).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();
        Table::new(columns, rows)
    }
}
