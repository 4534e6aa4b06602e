pub mod approve;
