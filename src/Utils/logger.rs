use chrono::Local;
use csv::Writer;
use log::LevelFilter;
use nalgebra::{DMatrix, DVector};
use simplelog::{
    ColorChoice, CombinedLogger, Config, SharedLogger, TermLogger, TerminalMode, WriteLogger,
};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// time-stamped log file name in `dir`: log_2024-05-01_12-00-00.txt
pub fn log_file_name(dir: &Path) -> PathBuf {
    let date_and_time = Local::now().format("%Y-%m-%d_%H-%M-%S");
    dir.join(format!("log_{}.txt", date_and_time))
}

/// Installs the global logger: terminal output plus, optionally, a copy in `log_file`.
///
/// Returns false if a logger was already installed (only the first call in a process wins).
pub fn init_logger(level: LevelFilter, log_file: Option<&Path>) -> bool {
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    loggers.push(TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ));
    if let Some(path) = log_file {
        match File::create(path) {
            Ok(file) => loggers.push(WriteLogger::new(level, Config::default(), file)),
            Err(e) => eprintln!("cannot create log file {}: {}", path.display(), e),
        }
    }
    CombinedLogger::init(loggers).is_ok()
}

/// Table with the argument in the first column and one column per row of `matrix`
/// (variables are rows, grid nodes are columns), tab separated.
pub fn save_matrix_to_file(
    matrix: &DMatrix<f64>,
    headers: &[String],
    filename: &Path,
    x_mesh: &DVector<f64>,
    arg: &str,
) -> io::Result<()> {
    let mut file = File::create(filename)?;
    let mut headers_with_x = vec![arg.to_string()];
    headers_with_x.extend(headers.iter().cloned());
    writeln!(file, "{}", headers_with_x.join("\t"))?;
    for (j, col) in matrix.column_iter().enumerate() {
        let mut row_data = vec![x_mesh[j].to_string()];
        row_data.extend(col.iter().map(|&val| val.to_string()));
        writeln!(file, "{}", row_data.join("\t"))?;
    }
    Ok(())
}

/// Same layout as [`save_matrix_to_file`], comma separated through `csv`.
pub fn save_matrix_to_csv(
    matrix: &DMatrix<f64>,
    headers: &[String],
    filename: &Path,
    x_mesh: &DVector<f64>,
    arg: &str,
) -> io::Result<()> {
    let file = File::create(filename)?;
    let mut writer = Writer::from_writer(file);
    let mut headers_with_x = vec![arg.to_string()];
    headers_with_x.extend(headers.iter().cloned());
    writer.write_record(&headers_with_x)?;
    for (j, col) in matrix.column_iter().enumerate() {
        let mut row_data = vec![x_mesh[j].to_string()];
        row_data.extend(col.iter().map(|&val| val.to_string()));
        writer.write_record(&row_data)?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads a table written by [`save_matrix_to_csv`]: (argument, matrix with one row per column of the file)
pub fn load_matrix_from_csv(filename: &Path) -> io::Result<(Vec<String>, DVector<f64>, DMatrix<f64>)> {
    let mut reader = csv::Reader::from_path(filename)?;
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let n_vars = headers.len().saturating_sub(1);
    let mut x = Vec::new();
    let mut data = Vec::new();
    for record in reader.records() {
        let record = record?;
        for (k, field) in record.iter().enumerate() {
            let val: f64 = field
                .trim()
                .parse()
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("{}: {}", field, e)))?;
            if k == 0 {
                x.push(val);
            } else {
                data.push(val);
            }
        }
    }
    if data.len() != n_vars * x.len() {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "ragged table"));
    }
    let matrix = DMatrix::from_column_slice(n_vars, x.len(), &data);
    Ok((headers, DVector::from_vec(x), matrix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_table_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.csv");
        let x = DVector::from_vec(vec![0.0, 0.5, 1.0]);
        let m = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, -1.0, -2.5, 1e-9]);
        let headers = vec!["x0".to_string(), "u".to_string()];
        save_matrix_to_csv(&m, &headers, &path, &x, "t").unwrap();
        let (h, x2, m2) = load_matrix_from_csv(&path).unwrap();
        assert_eq!(h, vec!["t", "x0", "u"]);
        assert_eq!(x2, x);
        assert_eq!(m2, m);
    }

    #[test]
    fn text_table_has_one_line_per_node() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.txt");
        let x = DVector::from_vec(vec![0.0, 1.0]);
        let m = DMatrix::from_row_slice(1, 2, &[4.0, 5.0]);
        save_matrix_to_file(&m, &["y".to_string()], &path, &x, "t").unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["t\ty", "0\t4", "1\t5"]);
    }

    #[test]
    fn log_file_name_is_time_stamped() {
        let name = log_file_name(Path::new("out"));
        let s = name.to_string_lossy();
        assert!(s.starts_with("out"));
        assert!(s.ends_with(".txt"));
        assert!(s.contains("log_"));
    }
}
