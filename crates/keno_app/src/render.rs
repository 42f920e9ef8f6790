use keno_core::{DrawResult, Notification, Phase, RunSnapshot};

const BAR_WIDTH: usize = 20;

pub fn status_line(view: &RunSnapshot) -> String {
    let label = match view.phase {
        Phase::Idle => "Ожидание",
        Phase::Running => "Парсинг в процессе...",
        Phase::Completed => "Готово",
        Phase::Failed => "Остановлено",
    };
    // Upstream percentages are stored unchecked; only the bar is clamped.
    let filled = view.progress.min(100) as usize * BAR_WIDTH / 100;
    format!(
        "{label} [{}{}] {}% завершено | Всего тиражей: {}",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        view.progress,
        view.results.len()
    )
}

pub fn notification_line(notification: &Notification) -> String {
    format!("{}: {}", notification.title(), notification.description())
}

/// Result table limited to the preview window, plus a hint when rows are hidden.
pub fn preview_lines(view: &RunSnapshot) -> Vec<String> {
    if view.results.is_empty() {
        return Vec::new();
    }
    let preview = view.preview();

    let mut lines = Vec::with_capacity(preview.rows.len() + 3);
    lines.push(format!("Результаты парсинга (всего тиражей: {})", view.results.len()));
    lines.push("№ Тиража | Дата | Выпавшие числа".to_string());
    lines.extend(preview.rows.iter().map(row));
    if preview.hidden > 0 {
        lines.push(format!(
            "Показано {} из {} тиражей. Используйте экспорт для полного списка.",
            preview.rows.len(),
            view.results.len()
        ));
    }
    lines
}

fn row(draw: &DrawResult) -> String {
    let numbers = draw
        .numbers
        .iter()
        .map(|n| format!("{n:>2}"))
        .collect::<Vec<_>>()
        .join(" ");
    format!("{} | {} | {}", draw.draw_number, draw.date, numbers)
}
