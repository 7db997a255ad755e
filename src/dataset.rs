use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::partition::PartitionsDef;

/// The spreadsheet families published by the city, one raw directory and one
/// staging table each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// Monthly consolidated expenditure.
    DespesaMensalConsolidada,
    /// Annual revenue forecast, broken down by month.
    ReceitaMensalPrevista,
    /// Monthly forecast-versus-collected revenue comparison.
    ReceitaMensalComparativa,
}

impl Variant {
    pub const ALL: [Variant; 3] = [
        Variant::DespesaMensalConsolidada,
        Variant::ReceitaMensalPrevista,
        Variant::ReceitaMensalComparativa,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Variant::DespesaMensalConsolidada => "despesa_mensal_consolidada",
            Variant::ReceitaMensalPrevista => "receita_mensal_prevista",
            Variant::ReceitaMensalComparativa => "receita_mensal_comparativa",
        }
    }

    /// Raw store directory, also used as the staging table name.
    pub fn directory(&self) -> &'static str {
        match self {
            Variant::DespesaMensalConsolidada => "pjf_despesa_mensal_consolidada",
            Variant::ReceitaMensalPrevista => "pjf_receita_mensal_prevista",
            Variant::ReceitaMensalComparativa => "pjf_receita_mensal_comparativa",
        }
    }

    pub fn table(&self) -> &'static str {
        self.directory()
    }

    /// Path under the transparency portal base URL, `{key}` is substituted.
    pub fn url_template(&self) -> &'static str {
        match self {
            Variant::DespesaMensalConsolidada => {
                "despesas_publicas/mensal_consolidada/arquivos/xls/{key}.xls"
            }
            Variant::ReceitaMensalPrevista => "receitas/mensal/previsao/arquivos/xls/{key}.xls",
            Variant::ReceitaMensalComparativa => {
                "receitas/mensal/comparativo/arquivos/xls/{key}.xls"
            }
        }
    }

    pub fn partitions(&self) -> PartitionsDef {
        match self {
            Variant::ReceitaMensalPrevista => PartitionsDef::yearly(0),
            Variant::DespesaMensalConsolidada | Variant::ReceitaMensalComparativa => {
                PartitionsDef::monthly(1)
            }
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        Variant::ALL
            .into_iter()
            .find(|v| v.name() == s || v.directory() == s)
            .ok_or(Error::UnknownVariant(s))
    }
}
