use std::fs::File;
use std::io;
use std::path::Path;

use crate::batch::FeatureMatrix;
use crate::error::Result;
use crate::features::BlockSelection;

/// Writes the matrix as CSV: an unnamed row-index column, `filename`, then
/// one column per feature.
pub fn write_csv<W: io::Write>(matrix: &FeatureMatrix, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec![String::new(), "filename".to_string()];
    header.extend(matrix.columns.iter().cloned());
    wtr.write_record(&header)?;

    for (i, row) in matrix.rows.iter().enumerate() {
        let mut record = Vec::with_capacity(row.values.len() + 2);
        record.push(i.to_string());
        record.push(row.filename.clone());
        record.extend(row.values.iter().map(|v| v.to_string()));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn save_csv(matrix: &FeatureMatrix, path: &Path) -> Result<()> {
    write_csv(matrix, File::create(path)?)
}

/// `<prefix>_<images>_<flags>.csv`, flags being `1`/`0` for area, spatial,
/// haralick and lbp.
pub fn default_output_name(prefix: &str, images: usize, selection: &BlockSelection) -> String {
    format!("{}_{}_{}.csv", prefix, images, selection.flags())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureBlock, FeatureRow};

    #[test]
    fn csv_layout() {
        let matrix = FeatureMatrix {
            columns: vec!["area_0".into(), "area_1".into()],
            rows: vec![
                FeatureRow {
                    filename: "a.png".into(),
                    values: vec![1.0, 0.0],
                },
                FeatureRow {
                    filename: "b, c.png".into(),
                    values: vec![0.25, 0.5],
                },
            ],
        };
        let mut out = Vec::new();
        write_csv(&matrix, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            ",filename,area_0,area_1\n0,a.png,1,0\n1,\"b, c.png\",0.25,0.5\n"
        );
    }

    #[test]
    fn output_name_encodes_selection() {
        let sel = BlockSelection::none()
            .with(FeatureBlock::Area)
            .with(FeatureBlock::Haralick)
            .with(FeatureBlock::Lbp);
        assert_eq!(
            default_output_name("feature-collection", 12, &sel),
            "feature-collection_12_1011.csv"
        );
    }
}
