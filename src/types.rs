/// Identifier shared by every record of one physical specimen.
/// Examples: `specimen_0042`, `RODI-2019-117`
pub type GroupId = String;
/// Class label as it appears in the source table.
/// Examples: `Baetis rhodani`, `0`, `ephemeroptera`
pub type LabelValue = String;
/// Name of a column in a tabular file.
/// Examples: `taxon`, `individual`, `y_true`, `3`
pub type ColumnName = String;
/// Position of a record in the original dataset (0-based, header excluded).
pub type RowIndex = usize;
/// Cross-validation fold number (0-based).
pub type FoldIndex = usize;
/// Dense class index used by label maps.
pub type ClassIndex = usize;
/// Raw cell text from a tabular file.
/// Examples: `train`, `0.9131`, `images/0042_a.png`
pub type Cell = String;
