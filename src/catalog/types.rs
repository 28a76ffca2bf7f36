// src/catalog/types.rs
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Запись каталога инструментов в том виде, как её отдаёт брокер.
/// Отсутствующие поля считаем пустыми.
#[derive(Deserialize, Debug, Clone)]
pub struct RawInstrument {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub exch_seg: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub token: String,
}

/// Инструмент после загрузки. Не меняется до следующей замены снимка.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instrument {
    pub display_name: String,
    pub trading_symbol: String,
    pub exchange_segment: String,
    pub token: String,
}

impl From<RawInstrument> for Instrument {
    fn from(raw: RawInstrument) -> Self {
        Self {
            display_name: raw.name,
            trading_symbol: raw.symbol,
            exchange_segment: raw.exch_seg,
            token: raw.token,
        }
    }
}

/// Результат поиска: то, что уходит в ордер
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSymbol {
    pub trading_symbol: String,
    pub token: String,
}

/// Как учитывать суффикс `-EQ` при поиске.
///
/// `Asymmetric` повторяет поведение старых скриптов: на NSE подходят только
/// символы с `-EQ`, на BSE только без него, прочие сегменты не подходят вовсе.
/// `Ignore` берёт первое совпадение по имени и бирже.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SuffixPolicy {
    #[default]
    Asymmetric,
    Ignore,
}

pub const EQUITY_SUFFIX: &str = "-EQ";

impl SuffixPolicy {
    /// `exchange` и `symbol` уже в верхнем регистре
    pub fn is_eligible(&self, exchange: &str, symbol: &str) -> bool {
        match self {
            SuffixPolicy::Ignore => true,
            SuffixPolicy::Asymmetric => match exchange {
                "NSE" => symbol.contains(EQUITY_SUFFIX),
                "BSE" => !symbol.contains(EQUITY_SUFFIX),
                _ => false,
            },
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}
