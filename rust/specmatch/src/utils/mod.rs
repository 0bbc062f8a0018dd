pub mod entropy;
pub mod normalization;
