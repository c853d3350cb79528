pub const SPBV01: &str = "spBv1.0";

pub const BDSEQ: &str = "bdSeq";

pub const NBIRTH: &str = "NBIRTH";
pub const NDEATH: &str = "NDEATH";
pub const NDATA: &str = "NDATA";
pub const NCMD: &str = "NCMD";

pub const DBIRTH: &str = "DBIRTH";
pub const DDEATH: &str = "DDEATH";
pub const DDATA: &str = "DDATA";
pub const DCMD: &str = "DCMD";

pub const STATE: &str = "STATE";
