//! Protocol-buffer messages of the binary protocol.
//!
//! Written out in the shape `prost-build` generates, so the crate needs no
//! build script or `protoc`.
//!
//! ```proto
//! message Requisicao { oneof tipo { ComandoAuth auth = 1; ComandoLogout logout = 2; ComandoOperacao operacao = 3; } }
//! message Resposta { oneof tipo { RespostaOk ok = 1; RespostaErro erro = 2; } }
//! ```

use std::collections::BTreeMap;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Requisicao {
    #[prost(oneof = "requisicao::Tipo", tags = "1, 2, 3")]
    pub tipo: Option<requisicao::Tipo>,
}

pub mod requisicao {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Tipo {
        #[prost(message, tag = "1")]
        Auth(super::ComandoAuth),
        #[prost(message, tag = "2")]
        Logout(super::ComandoLogout),
        #[prost(message, tag = "3")]
        Operacao(super::ComandoOperacao),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ComandoAuth {
    #[prost(string, tag = "1")]
    pub aluno_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ComandoLogout {
    #[prost(string, tag = "1")]
    pub token: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ComandoOperacao {
    #[prost(string, tag = "1")]
    pub token: String,
    #[prost(string, tag = "2")]
    pub operacao: String,
    #[prost(btree_map = "string, string", tag = "3")]
    pub parametros: BTreeMap<String, String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Resposta {
    #[prost(oneof = "resposta::Tipo", tags = "1, 2")]
    pub tipo: Option<resposta::Tipo>,
}

pub mod resposta {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Tipo {
        #[prost(message, tag = "1")]
        Ok(super::RespostaOk),
        #[prost(message, tag = "2")]
        Erro(super::RespostaErro),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RespostaOk {
    #[prost(string, tag = "1")]
    pub comando: String,
    #[prost(btree_map = "string, string", tag = "2")]
    pub dados: BTreeMap<String, String>,
    #[prost(string, tag = "3")]
    pub timestamp: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RespostaErro {
    #[prost(string, tag = "1")]
    pub mensagem: String,
    #[prost(btree_map = "string, string", tag = "2")]
    pub detalhes: BTreeMap<String, String>,
}
