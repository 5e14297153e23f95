use crate::result::ScanResult;

const HEADERS: [&str; 4] = ["Infected", "Result", "Engine", "Updated"];

/// Render a result as a Markdown table under a `#### Windows Defender` heading.
pub fn render(result: &ScanResult) -> String {
    let row = [
        result.is_infected().to_string(),
        escape(result.result()),
        escape(result.engine()),
        escape(result.updated()),
    ];

    let widths: Vec<usize> = HEADERS
        .iter()
        .zip(row.iter())
        .map(|(h, v)| h.chars().count().max(v.chars().count()))
        .collect();

    let mut output = String::from("#### Windows Defender\n");
    output.push_str(&line(HEADERS.iter().copied(), &widths));
    output.push_str(&line(widths.iter().map(|w| "-".repeat(*w)), &widths));
    output.push_str(&line(row.iter(), &widths));
    output
}

fn escape(cell: &str) -> String {
    cell.replace('|', "\\|")
}

fn line<S: AsRef<str>>(cells: impl Iterator<Item = S>, widths: &[usize]) -> String {
    let cells: Vec<String> = cells
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell.as_ref(), width = *width))
        .collect();
    format!("| {} |\n", cells.join(" | "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn infected_table() {
        let result = ScanResult::infected("Virus:DOS/EICAR_Test_File", "", "20170707");
        let expected = "#### Windows Defender\n\
            | Infected | Result                    | Engine | Updated  |\n\
            | -------- | ------------------------- | ------ | -------- |\n\
            | true     | Virus:DOS/EICAR_Test_File |        | 20170707 |\n";
        assert_eq!(render(&result), expected);
    }

    #[test]
    fn clean_table_has_blank_result() {
        let out = render(&ScanResult::clean("", ""));
        assert!(out.contains("| false    |        |        |         |"));
    }
}
