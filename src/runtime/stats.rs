//! `show stat` reply parsing.

use std::collections::HashMap;

use serde::Serialize;

use crate::runtime::ChannelError;

/// One row of the runtime statistics table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerStat {
    pub proxy: String,
    pub server: String,
    pub status: String,
    pub weight: Option<u32>,
    pub current_sessions: Option<u64>,
    /// `FRONTEND` / `BACKEND` summary rows.
    pub aggregate: bool,
}

/// Parse the CSV table returned by `show stat`.
///
/// Columns are located by header name, so extra or reordered columns are
/// tolerated; only `pxname` and `svname` are required.
pub fn parse_stat_csv(reply: &str) -> Result<Vec<ServerStat>, ChannelError> {
    let mut lines = reply.lines().filter(|l| !l.trim().is_empty());

    let header = lines
        .next()
        .and_then(|l| l.strip_prefix('#'))
        .ok_or_else(|| ChannelError::Protocol("stat reply has no header".to_string()))?;

    let columns: HashMap<&str, usize> = header
        .split(',')
        .enumerate()
        .map(|(i, name)| (name.trim(), i))
        .collect();

    let column = |name: &str| {
        columns.get(name).copied().ok_or_else(|| {
            ChannelError::Protocol(format!("stat reply is missing column '{}'", name))
        })
    };
    let pxname = column("pxname")?;
    let svname = column("svname")?;
    let status = columns.get("status").copied();
    let weight = columns.get("weight").copied();
    let scur = columns.get("scur").copied();

    let mut stats = Vec::new();
    for line in lines {
        let fields: Vec<&str> = line.split(',').collect();
        let field = |idx: Option<usize>| idx.and_then(|i| fields.get(i)).map(|v| v.trim());

        let (Some(proxy), Some(server)) = (field(Some(pxname)), field(Some(svname))) else {
            tracing::debug!(line = %line, "Skipping short stat row");
            continue;
        };

        stats.push(ServerStat {
            proxy: proxy.to_string(),
            server: server.to_string(),
            status: field(status).unwrap_or_default().to_string(),
            weight: field(weight).and_then(|v| v.parse().ok()),
            current_sessions: field(scur).and_then(|v| v.parse().ok()),
            aggregate: server == "FRONTEND" || server == "BACKEND",
        });
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# pxname,svname,qcur,qmax,scur,smax,slim,stot,bin,bout,dreq,dresp,ereq,econ,eresp,wretr,wredis,status,weight
stats,FRONTEND,,,1,2,2000,5,0,0,0,0,0,,,,,OPEN,
pool_a,n1,0,0,3,4,,10,0,0,,0,,0,0,0,0,UP,100
pool_a,n2,0,0,0,1,,2,0,0,,0,,0,0,0,0,DOWN,50
pool_a,BACKEND,0,0,3,4,200,12,0,0,0,0,,0,0,0,0,UP,150

";

    #[test]
    fn test_parse_sample_table() {
        let stats = parse_stat_csv(SAMPLE).unwrap();
        assert_eq!(stats.len(), 4);

        assert!(stats[0].aggregate);
        assert_eq!(stats[0].status, "OPEN");
        assert_eq!(stats[0].weight, None);

        assert_eq!(stats[1].proxy, "pool_a");
        assert_eq!(stats[1].server, "n1");
        assert_eq!(stats[1].status, "UP");
        assert_eq!(stats[1].weight, Some(100));
        assert_eq!(stats[1].current_sessions, Some(3));
        assert!(!stats[1].aggregate);

        assert_eq!(stats[2].status, "DOWN");
        assert!(stats[3].aggregate);
    }

    #[test]
    fn test_missing_header_is_protocol_error() {
        let err = parse_stat_csv("pool_a,n1,UP\n").unwrap_err();
        assert!(matches!(err, ChannelError::Protocol(_)));

        let err = parse_stat_csv("# foo,bar\n").unwrap_err();
        assert!(err.to_string().contains("pxname"));
    }
}
