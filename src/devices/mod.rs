pub mod genet;
