// src/frontend/mod.rs

pub mod console;
pub mod telegram;
pub mod web;

/// Разбор выбора счетов: `all`/`все` или номера через запятую (с единицы)
pub fn parse_selection(input: &str, total: usize) -> Result<Vec<usize>, String> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("all") || input.eq_ignore_ascii_case("все") || input == "*" {
        return Ok((0..total).collect());
    }
    let mut picked = Vec::new();
    for part in input.split(|c: char| c == ',' || c.is_whitespace()).filter(|p| !p.is_empty()) {
        let n: usize = part
            .parse()
            .map_err(|_| format!("`{}` не номер счёта", part))?;
        if n == 0 || n > total {
            return Err(format!("нет счёта с номером {}", n));
        }
        if !picked.contains(&(n - 1)) {
            picked.push(n - 1);
        }
    }
    Ok(picked)
}
