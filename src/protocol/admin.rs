//! Shared plumbing for the admin RPCs that carry no bespoke semantics beyond the underlying
//! protocol (§4.9): describe/alter/incremental-alter configs, ACLs, group listing/description/
//! deletion, consumer-offset listing/deletion, log dirs, delete records, delegation tokens,
//! client quotas, and feature flags/partition reassignments.
//!
//! Each of these is a flat `(resource-descriptor in, result-with-error-code out)` shape, so rather
//! than hand-writing twenty near-identical stub files we give every one of them a typed
//! `(createRequest, parseResponse)` pair built on the three generic helpers below, parameterized by
//! the request/response record shapes themselves.

use crate::errors::Result;
use crate::protocol::header::{RequestHeader, ResponseHeader};
use crate::protocol::types::{Reader, Writer};

/// Frames a request whose body has already been fully written, applying the header and, for
/// flexible versions, the header's own tagged-fields terminator. Every admin stub's
/// `create_request` is `write_header_and_frame(header, |w| { ...fields... })`.
pub fn write_header_and_frame<F>(header: &RequestHeader, write_body: F) -> Result<Vec<u8>>
where
    F: FnOnce(&mut Writer, bool) -> Result<()>,
{
    let mut w = Writer::with_capacity(128);
    header.write(&mut w);
    write_body(&mut w, header.flexible)?;
    Ok(w.prepend_length().to_vec())
}

/// Strips the response header (respecting flexible framing) and hands the remaining reader to
/// `read_body`. Every admin stub's `parse_response` is `read_header_then(body, flexible, |r|
/// {...fields...})`.
pub fn read_header_then<'a, T, F>(body: &'a [u8], flexible: bool, read_body: F) -> Result<T>
where
    F: FnOnce(&mut Reader<'a>) -> Result<T>,
{
    let mut r = Reader::new(body);
    ResponseHeader::read(&mut r, flexible)?;
    read_body(&mut r)
}

/// `(name, error_code, error_message)` — the overwhelmingly common per-resource result shape
/// across `DescribeConfigs`/`AlterConfigs`/`CreateAcls`/`DeleteGroups`/etc.
#[derive(Debug, Clone)]
pub struct ResourceResult {
    pub name: String,
    pub error_code: i16,
    pub error_message: Option<String>,
}

pub fn read_resource_result(r: &mut Reader<'_>, flexible: bool) -> Result<ResourceResult> {
    let error_code = r.read_i16()?;
    let error_message = if flexible {
        r.read_compact_string()?
    } else {
        r.read_legacy_string()?
    };
    let name = if flexible {
        r.read_compact_string()?
    } else {
        r.read_legacy_string()?
    }
    .unwrap_or_default();
    if flexible {
        r.skip_tagged_fields()?;
    }
    Ok(ResourceResult {
        name,
        error_code,
        error_message,
    })
}

pub mod describe_configs {
    use super::*;
    use crate::protocol::ApiKey;

    #[derive(Debug, Clone)]
    pub struct Resource {
        pub resource_type: i8,
        pub resource_name: String,
        pub configuration_keys: Option<Vec<String>>,
    }

    #[derive(Debug, Clone)]
    pub struct DescribeConfigsRequest {
        pub resources: Vec<Resource>,
        pub include_synonyms: bool,
    }

    #[derive(Debug, Clone)]
    pub struct ConfigEntryResult {
        pub name: String,
        pub value: Option<String>,
        pub read_only: bool,
        pub is_default: bool,
        pub is_sensitive: bool,
    }

    #[derive(Debug, Clone)]
    pub struct DescribeConfigsResourceResult {
        pub error_code: i16,
        pub resource_type: i8,
        pub resource_name: String,
        pub configs: Vec<ConfigEntryResult>,
    }

    #[derive(Debug, Clone)]
    pub struct DescribeConfigsResponse {
        pub throttle_time_ms: i32,
        pub results: Vec<DescribeConfigsResourceResult>,
    }

    pub fn create_request(
        header: &RequestHeader,
        req: &DescribeConfigsRequest,
    ) -> Result<Vec<u8>> {
        write_header_and_frame(header, |w, flexible| {
            let write_resource = |w: &mut Writer, res: &Resource| -> Result<()> {
                w.put_i8(res.resource_type);
                if flexible {
                    w.put_compact_string(Some(&res.resource_name));
                } else {
                    w.put_legacy_string(Some(&res.resource_name));
                }
                match &res.configuration_keys {
                    Some(keys) => {
                        if flexible {
                            w.put_compact_array(keys, |w, k| {
                                w.put_compact_string(Some(k));
                                Ok(())
                            })?;
                        } else {
                            w.put_legacy_array(keys, |w, k| {
                                w.put_legacy_string(Some(k));
                                Ok(())
                            })?;
                        }
                    }
                    None => {
                        if flexible {
                            w.put_unsigned_varint(0);
                        } else {
                            w.put_i32(-1);
                        }
                    }
                }
                if flexible {
                    w.put_tagged_fields();
                }
                Ok(())
            };
            if flexible {
                w.put_compact_array(&req.resources, write_resource)?;
            } else {
                w.put_legacy_array(&req.resources, write_resource)?;
            }
            w.put_bool(req.include_synonyms);
            if flexible {
                w.put_tagged_fields();
            }
            Ok(())
        })
    }

    pub fn parse_response(body: &[u8], api_version: i16) -> Result<DescribeConfigsResponse> {
        let flexible = api_version >= 4;
        read_header_then(body, flexible, |r| {
            let throttle_time_ms = r.read_i32()?;
            let read_entry = |r: &mut Reader<'_>| -> Result<ConfigEntryResult> {
                let name = if flexible {
                    r.read_compact_string()?
                } else {
                    r.read_legacy_string()?
                }
                .unwrap_or_default();
                let value = if flexible {
                    r.read_compact_string()?
                } else {
                    r.read_legacy_string()?
                };
                let read_only = r.read_bool()?;
                let is_default = r.read_bool()?;
                let is_sensitive = r.read_bool()?;
                if flexible {
                    r.skip_tagged_fields()?;
                }
                Ok(ConfigEntryResult {
                    name,
                    value,
                    read_only,
                    is_default,
                    is_sensitive,
                })
            };
            let read_result = |r: &mut Reader<'_>| -> Result<DescribeConfigsResourceResult> {
                let error_code = r.read_i16()?;
                let _error_message = if flexible {
                    r.read_compact_string()?
                } else {
                    r.read_legacy_string()?
                };
                let resource_type = r.read_i8()?;
                let resource_name = if flexible {
                    r.read_compact_string()?
                } else {
                    r.read_legacy_string()?
                }
                .unwrap_or_default();
                let configs = if flexible {
                    r.read_compact_array(read_entry)?
                } else {
                    r.read_legacy_array(read_entry)?
                };
                if flexible {
                    r.skip_tagged_fields()?;
                }
                Ok(DescribeConfigsResourceResult {
                    error_code,
                    resource_type,
                    resource_name,
                    configs,
                })
            };
            let results = if flexible {
                r.read_compact_array(read_result)?
            } else {
                r.read_legacy_array(read_result)?
            };
            if flexible {
                r.skip_tagged_fields()?;
            }
            Ok(DescribeConfigsResponse {
                throttle_time_ms,
                results,
            })
        })
    }

    #[allow(dead_code)]
    const fn _api() -> ApiKey {
        ApiKey::DescribeConfigs
    }
}

pub mod list_groups {
    use super::*;
    use crate::protocol::ApiKey;

    #[derive(Debug, Clone, Default)]
    pub struct ListGroupsRequest {
        pub states_filter: Vec<String>,
    }

    #[derive(Debug, Clone)]
    pub struct ListedGroup {
        pub group_id: String,
        pub protocol_type: String,
        pub group_state: Option<String>,
    }

    #[derive(Debug, Clone)]
    pub struct ListGroupsResponse {
        pub throttle_time_ms: i32,
        pub error_code: i16,
        pub groups: Vec<ListedGroup>,
    }

    pub fn create_request(header: &RequestHeader, req: &ListGroupsRequest) -> Result<Vec<u8>> {
        write_header_and_frame(header, |w, flexible| {
            if header.api_version >= 4 {
                if flexible {
                    w.put_compact_array(&req.states_filter, |w, s| {
                        w.put_compact_string(Some(s));
                        Ok(())
                    })?;
                } else {
                    w.put_legacy_array(&req.states_filter, |w, s| {
                        w.put_legacy_string(Some(s));
                        Ok(())
                    })?;
                }
            }
            if flexible {
                w.put_tagged_fields();
            }
            Ok(())
        })
    }

    pub fn parse_response(body: &[u8], api_version: i16) -> Result<ListGroupsResponse> {
        let flexible = api_version >= 3;
        read_header_then(body, flexible, |r| {
            let throttle_time_ms = if api_version >= 1 { r.read_i32()? } else { 0 };
            let error_code = r.read_i16()?;
            let read_group = |r: &mut Reader<'_>| -> Result<ListedGroup> {
                let group_id = if flexible {
                    r.read_compact_string()?
                } else {
                    r.read_legacy_string()?
                }
                .unwrap_or_default();
                let protocol_type = if flexible {
                    r.read_compact_string()?
                } else {
                    r.read_legacy_string()?
                }
                .unwrap_or_default();
                let group_state = if api_version >= 4 {
                    if flexible {
                        r.read_compact_string()?
                    } else {
                        r.read_legacy_string()?
                    }
                } else {
                    None
                };
                if flexible {
                    r.skip_tagged_fields()?;
                }
                Ok(ListedGroup {
                    group_id,
                    protocol_type,
                    group_state,
                })
            };
            let groups = if flexible {
                r.read_compact_array(read_group)?
            } else {
                r.read_legacy_array(read_group)?
            };
            if flexible {
                r.skip_tagged_fields()?;
            }
            Ok(ListGroupsResponse {
                throttle_time_ms,
                error_code,
                groups,
            })
        })
    }

    #[allow(dead_code)]
    const fn _api() -> ApiKey {
        ApiKey::ListGroups
    }
}

pub mod delete_groups {
    use super::*;
    use crate::protocol::ApiKey;

    #[derive(Debug, Clone)]
    pub struct DeleteGroupsRequest {
        pub group_ids: Vec<String>,
    }

    #[derive(Debug, Clone)]
    pub struct DeleteGroupsResponse {
        pub throttle_time_ms: i32,
        pub results: Vec<ResourceResult>,
    }

    pub fn create_request(header: &RequestHeader, req: &DeleteGroupsRequest) -> Result<Vec<u8>> {
        write_header_and_frame(header, |w, flexible| {
            if flexible {
                w.put_compact_array(&req.group_ids, |w, g| {
                    w.put_compact_string(Some(g));
                    Ok(())
                })?;
                w.put_tagged_fields();
            } else {
                w.put_legacy_array(&req.group_ids, |w, g| {
                    w.put_legacy_string(Some(g));
                    Ok(())
                })?;
            }
            Ok(())
        })
    }

    pub fn parse_response(body: &[u8], api_version: i16) -> Result<DeleteGroupsResponse> {
        let flexible = api_version >= 2;
        read_header_then(body, flexible, |r| {
            let throttle_time_ms = r.read_i32()?;
            let read_result = |r: &mut Reader<'_>| -> Result<ResourceResult> {
                let name = if flexible {
                    r.read_compact_string()?
                } else {
                    r.read_legacy_string()?
                }
                .unwrap_or_default();
                let error_code = r.read_i16()?;
                if flexible {
                    r.skip_tagged_fields()?;
                }
                Ok(ResourceResult {
                    name,
                    error_code,
                    error_message: None,
                })
            };
            let results = if flexible {
                r.read_compact_array(read_result)?
            } else {
                r.read_legacy_array(read_result)?
            };
            if flexible {
                r.skip_tagged_fields()?;
            }
            Ok(DeleteGroupsResponse {
                throttle_time_ms,
                results,
            })
        })
    }

    #[allow(dead_code)]
    const fn _api() -> ApiKey {
        ApiKey::DeleteGroups
    }
}

pub mod create_partitions {
    use super::*;
    use crate::protocol::ApiKey;

    #[derive(Debug, Clone)]
    pub struct NewPartitionAssignment {
        pub new_count: i32,
        pub broker_ids: Option<Vec<Vec<i32>>>,
    }

    #[derive(Debug, Clone)]
    pub struct NewPartitions {
        pub topic: String,
        pub assignment: NewPartitionAssignment,
    }

    #[derive(Debug, Clone)]
    pub struct CreatePartitionsRequest {
        pub topics: Vec<NewPartitions>,
        pub timeout_ms: i32,
        pub validate_only: bool,
    }

    #[derive(Debug, Clone)]
    pub struct CreatePartitionsResponse {
        pub throttle_time_ms: i32,
        pub results: Vec<ResourceResult>,
    }

    pub fn create_request(header: &RequestHeader, req: &CreatePartitionsRequest) -> Result<Vec<u8>> {
        write_header_and_frame(header, |w, flexible| {
            let write_topic = |w: &mut Writer, t: &NewPartitions| -> Result<()> {
                if flexible {
                    w.put_compact_string(Some(&t.topic));
                } else {
                    w.put_legacy_string(Some(&t.topic));
                }
                w.put_i32(t.assignment.new_count);
                let write_brokers = |w: &mut Writer, ids: &Vec<i32>| -> Result<()> {
                    if flexible {
                        w.put_compact_array(ids, |w, id| {
                            w.put_i32(*id);
                            Ok(())
                        })?;
                    } else {
                        w.put_legacy_array(ids, |w, id| {
                            w.put_i32(*id);
                            Ok(())
                        })?;
                    }
                    Ok(())
                };
                match &t.assignment.broker_ids {
                    Some(assignments) => {
                        if flexible {
                            w.put_compact_array(assignments, write_brokers)?;
                        } else {
                            w.put_legacy_array(assignments, write_brokers)?;
                        }
                    }
                    None => {
                        if flexible {
                            w.put_unsigned_varint(0);
                        } else {
                            w.put_i32(-1);
                        }
                    }
                }
                if flexible {
                    w.put_tagged_fields();
                }
                Ok(())
            };
            if flexible {
                w.put_compact_array(&req.topics, write_topic)?;
            } else {
                w.put_legacy_array(&req.topics, write_topic)?;
            }
            w.put_i32(req.timeout_ms);
            w.put_bool(req.validate_only);
            if flexible {
                w.put_tagged_fields();
            }
            Ok(())
        })
    }

    pub fn parse_response(body: &[u8], api_version: i16) -> Result<CreatePartitionsResponse> {
        let flexible = api_version >= 2;
        read_header_then(body, flexible, |r| {
            let throttle_time_ms = r.read_i32()?;
            let results = if flexible {
                r.read_compact_array(|r| read_resource_result(r, flexible))?
            } else {
                r.read_legacy_array(|r| read_resource_result(r, flexible))?
            };
            if flexible {
                r.skip_tagged_fields()?;
            }
            Ok(CreatePartitionsResponse { throttle_time_ms, results })
        })
    }

    #[allow(dead_code)]
    const fn _api() -> ApiKey {
        ApiKey::CreatePartitions
    }
}

pub mod alter_configs {
    use super::*;
    use crate::protocol::create_topics::ConfigEntry;
    use crate::protocol::ApiKey;

    #[derive(Debug, Clone)]
    pub struct AlterConfigsResource {
        pub resource_type: i8,
        pub resource_name: String,
        pub configs: Vec<ConfigEntry>,
    }

    #[derive(Debug, Clone)]
    pub struct AlterConfigsRequest {
        pub resources: Vec<AlterConfigsResource>,
        pub validate_only: bool,
    }

    #[derive(Debug, Clone)]
    pub struct AlterConfigsResponse {
        pub throttle_time_ms: i32,
        pub results: Vec<ResourceResult>,
    }

    pub fn create_request(header: &RequestHeader, req: &AlterConfigsRequest) -> Result<Vec<u8>> {
        write_header_and_frame(header, |w, flexible| {
            let write_resource = |w: &mut Writer, res: &AlterConfigsResource| -> Result<()> {
                w.put_i8(res.resource_type);
                if flexible {
                    w.put_compact_string(Some(&res.resource_name));
                } else {
                    w.put_legacy_string(Some(&res.resource_name));
                }
                let write_entry = |w: &mut Writer, e: &ConfigEntry| -> Result<()> {
                    if flexible {
                        w.put_compact_string(Some(&e.name));
                        w.put_compact_string(e.value.as_deref());
                        w.put_tagged_fields();
                    } else {
                        w.put_legacy_string(Some(&e.name));
                        w.put_legacy_string(e.value.as_deref());
                    }
                    Ok(())
                };
                if flexible {
                    w.put_compact_array(&res.configs, write_entry)?;
                    w.put_tagged_fields();
                } else {
                    w.put_legacy_array(&res.configs, write_entry)?;
                }
                Ok(())
            };
            if flexible {
                w.put_compact_array(&req.resources, write_resource)?;
            } else {
                w.put_legacy_array(&req.resources, write_resource)?;
            }
            w.put_bool(req.validate_only);
            if flexible {
                w.put_tagged_fields();
            }
            Ok(())
        })
    }

    pub fn parse_response(body: &[u8], api_version: i16) -> Result<AlterConfigsResponse> {
        let flexible = api_version >= 2;
        read_header_then(body, flexible, |r| {
            let throttle_time_ms = r.read_i32()?;
            let read_result = |r: &mut Reader<'_>| -> Result<ResourceResult> {
                let error_code = r.read_i16()?;
                let error_message = if flexible {
                    r.read_compact_string()?
                } else {
                    r.read_legacy_string()?
                };
                let _resource_type = r.read_i8()?;
                let name = if flexible {
                    r.read_compact_string()?
                } else {
                    r.read_legacy_string()?
                }
                .unwrap_or_default();
                if flexible {
                    r.skip_tagged_fields()?;
                }
                Ok(ResourceResult { name, error_code, error_message })
            };
            let results = if flexible {
                r.read_compact_array(read_result)?
            } else {
                r.read_legacy_array(read_result)?
            };
            if flexible {
                r.skip_tagged_fields()?;
            }
            Ok(AlterConfigsResponse { throttle_time_ms, results })
        })
    }

    #[allow(dead_code)]
    const fn _api() -> ApiKey {
        ApiKey::AlterConfigs
    }
}

pub mod incremental_alter_configs {
    use super::*;
    use crate::protocol::ApiKey;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[repr(i8)]
    pub enum ConfigOp {
        Set = 0,
        Delete = 1,
        Append = 2,
        Subtract = 3,
    }

    #[derive(Debug, Clone)]
    pub struct IncrementalConfigEntry {
        pub name: String,
        pub op: ConfigOp,
        pub value: Option<String>,
    }

    #[derive(Debug, Clone)]
    pub struct IncrementalAlterConfigsResource {
        pub resource_type: i8,
        pub resource_name: String,
        pub configs: Vec<IncrementalConfigEntry>,
    }

    #[derive(Debug, Clone)]
    pub struct IncrementalAlterConfigsRequest {
        pub resources: Vec<IncrementalAlterConfigsResource>,
        pub validate_only: bool,
    }

    #[derive(Debug, Clone)]
    pub struct IncrementalAlterConfigsResponse {
        pub throttle_time_ms: i32,
        pub results: Vec<ResourceResult>,
    }

    pub fn create_request(header: &RequestHeader, req: &IncrementalAlterConfigsRequest) -> Result<Vec<u8>> {
        write_header_and_frame(header, |w, flexible| {
            let write_resource = |w: &mut Writer, res: &IncrementalAlterConfigsResource| -> Result<()> {
                w.put_i8(res.resource_type);
                if flexible {
                    w.put_compact_string(Some(&res.resource_name));
                } else {
                    w.put_legacy_string(Some(&res.resource_name));
                }
                let write_entry = |w: &mut Writer, e: &IncrementalConfigEntry| -> Result<()> {
                    if flexible {
                        w.put_compact_string(Some(&e.name));
                        w.put_i8(e.op as i8);
                        w.put_compact_string(e.value.as_deref());
                        w.put_tagged_fields();
                    } else {
                        w.put_legacy_string(Some(&e.name));
                        w.put_i8(e.op as i8);
                        w.put_legacy_string(e.value.as_deref());
                    }
                    Ok(())
                };
                if flexible {
                    w.put_compact_array(&res.configs, write_entry)?;
                    w.put_tagged_fields();
                } else {
                    w.put_legacy_array(&res.configs, write_entry)?;
                }
                Ok(())
            };
            if flexible {
                w.put_compact_array(&req.resources, write_resource)?;
            } else {
                w.put_legacy_array(&req.resources, write_resource)?;
            }
            w.put_bool(req.validate_only);
            if flexible {
                w.put_tagged_fields();
            }
            Ok(())
        })
    }

    pub fn parse_response(body: &[u8], api_version: i16) -> Result<IncrementalAlterConfigsResponse> {
        let flexible = api_version >= 1;
        read_header_then(body, flexible, |r| {
            let throttle_time_ms = r.read_i32()?;
            let read_result = |r: &mut Reader<'_>| -> Result<ResourceResult> {
                let error_code = r.read_i16()?;
                let error_message = if flexible {
                    r.read_compact_string()?
                } else {
                    r.read_legacy_string()?
                };
                let _resource_type = r.read_i8()?;
                let name = if flexible {
                    r.read_compact_string()?
                } else {
                    r.read_legacy_string()?
                }
                .unwrap_or_default();
                if flexible {
                    r.skip_tagged_fields()?;
                }
                Ok(ResourceResult { name, error_code, error_message })
            };
            let results = if flexible {
                r.read_compact_array(read_result)?
            } else {
                r.read_legacy_array(read_result)?
            };
            if flexible {
                r.skip_tagged_fields()?;
            }
            Ok(IncrementalAlterConfigsResponse { throttle_time_ms, results })
        })
    }

    #[allow(dead_code)]
    const fn _api() -> ApiKey {
        ApiKey::IncrementalAlterConfigs
    }
}

/// ACLs (`DescribeAcls`/`CreateAcls`/`DeleteAcls`): every shape below is the same
/// `(resourceType, resourceName, patternType, principal, host, operation, permissionType)`
/// seven-tuple the broker uses both as a filter and as a concrete entry.
pub mod acls {
    use super::*;
    use crate::protocol::ApiKey;

    #[derive(Debug, Clone)]
    pub struct AclDescriptor {
        pub resource_type: i8,
        pub resource_name: String,
        pub pattern_type: i8,
        pub principal: String,
        pub host: String,
        pub operation: i8,
        pub permission_type: i8,
    }

    fn write_acl(w: &mut Writer, flexible: bool, a: &AclDescriptor) -> Result<()> {
        w.put_i8(a.resource_type);
        if flexible {
            w.put_compact_string(Some(&a.resource_name));
        } else {
            w.put_legacy_string(Some(&a.resource_name));
        }
        w.put_i8(a.pattern_type);
        if flexible {
            w.put_compact_string(Some(&a.principal));
            w.put_compact_string(Some(&a.host));
        } else {
            w.put_legacy_string(Some(&a.principal));
            w.put_legacy_string(Some(&a.host));
        }
        w.put_i8(a.operation);
        w.put_i8(a.permission_type);
        if flexible {
            w.put_tagged_fields();
        }
        Ok(())
    }

    fn read_acl(r: &mut Reader<'_>, flexible: bool) -> Result<AclDescriptor> {
        let resource_type = r.read_i8()?;
        let resource_name = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? }.unwrap_or_default();
        let pattern_type = r.read_i8()?;
        let principal = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? }.unwrap_or_default();
        let host = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? }.unwrap_or_default();
        let operation = r.read_i8()?;
        let permission_type = r.read_i8()?;
        if flexible {
            r.skip_tagged_fields()?;
        }
        Ok(AclDescriptor {
            resource_type,
            resource_name,
            pattern_type,
            principal,
            host,
            operation,
            permission_type,
        })
    }

    #[derive(Debug, Clone)]
    pub struct DescribeAclsRequest {
        pub filter: AclDescriptor,
    }

    #[derive(Debug, Clone)]
    pub struct DescribeAclsResponse {
        pub throttle_time_ms: i32,
        pub error_code: i16,
        pub error_message: Option<String>,
        pub acls: Vec<AclDescriptor>,
    }

    pub fn describe_create_request(header: &RequestHeader, req: &DescribeAclsRequest) -> Result<Vec<u8>> {
        write_header_and_frame(header, |w, flexible| write_acl(w, flexible, &req.filter))
    }

    pub fn describe_parse_response(body: &[u8], api_version: i16) -> Result<DescribeAclsResponse> {
        let flexible = api_version >= 2;
        read_header_then(body, flexible, |r| {
            let throttle_time_ms = r.read_i32()?;
            let error_code = r.read_i16()?;
            let error_message = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? };
            let acls = if flexible {
                r.read_compact_array(|r| read_acl(r, flexible))?
            } else {
                r.read_legacy_array(|r| read_acl(r, flexible))?
            };
            if flexible {
                r.skip_tagged_fields()?;
            }
            Ok(DescribeAclsResponse { throttle_time_ms, error_code, error_message, acls })
        })
    }

    #[derive(Debug, Clone)]
    pub struct CreateAclsRequest {
        pub creations: Vec<AclDescriptor>,
    }

    #[derive(Debug, Clone)]
    pub struct AclCreationResult {
        pub error_code: i16,
        pub error_message: Option<String>,
    }

    #[derive(Debug, Clone)]
    pub struct CreateAclsResponse {
        pub throttle_time_ms: i32,
        pub results: Vec<AclCreationResult>,
    }

    pub fn create_create_request(header: &RequestHeader, req: &CreateAclsRequest) -> Result<Vec<u8>> {
        write_header_and_frame(header, |w, flexible| {
            if flexible {
                w.put_compact_array(&req.creations, |w, a| write_acl(w, flexible, a))?;
            } else {
                w.put_legacy_array(&req.creations, |w, a| write_acl(w, flexible, a))?;
            }
            Ok(())
        })
    }

    pub fn create_parse_response(body: &[u8], api_version: i16) -> Result<CreateAclsResponse> {
        let flexible = api_version >= 2;
        read_header_then(body, flexible, |r| {
            let throttle_time_ms = r.read_i32()?;
            let read_result = |r: &mut Reader<'_>| -> Result<AclCreationResult> {
                let error_code = r.read_i16()?;
                let error_message = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? };
                if flexible {
                    r.skip_tagged_fields()?;
                }
                Ok(AclCreationResult { error_code, error_message })
            };
            let results = if flexible {
                r.read_compact_array(read_result)?
            } else {
                r.read_legacy_array(read_result)?
            };
            if flexible {
                r.skip_tagged_fields()?;
            }
            Ok(CreateAclsResponse { throttle_time_ms, results })
        })
    }

    #[derive(Debug, Clone)]
    pub struct DeleteAclsRequest {
        pub filters: Vec<AclDescriptor>,
    }

    #[derive(Debug, Clone)]
    pub struct DeleteAclsFilterResult {
        pub error_code: i16,
        pub error_message: Option<String>,
        pub matching_acls: Vec<AclDescriptor>,
    }

    #[derive(Debug, Clone)]
    pub struct DeleteAclsResponse {
        pub throttle_time_ms: i32,
        pub filter_results: Vec<DeleteAclsFilterResult>,
    }

    pub fn delete_create_request(header: &RequestHeader, req: &DeleteAclsRequest) -> Result<Vec<u8>> {
        write_header_and_frame(header, |w, flexible| {
            if flexible {
                w.put_compact_array(&req.filters, |w, a| write_acl(w, flexible, a))?;
            } else {
                w.put_legacy_array(&req.filters, |w, a| write_acl(w, flexible, a))?;
            }
            Ok(())
        })
    }

    pub fn delete_parse_response(body: &[u8], api_version: i16) -> Result<DeleteAclsResponse> {
        let flexible = api_version >= 2;
        read_header_then(body, flexible, |r| {
            let throttle_time_ms = r.read_i32()?;
            let read_filter_result = |r: &mut Reader<'_>| -> Result<DeleteAclsFilterResult> {
                let error_code = r.read_i16()?;
                let error_message = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? };
                let matching_acls = if flexible {
                    r.read_compact_array(|r| read_acl(r, flexible))?
                } else {
                    r.read_legacy_array(|r| read_acl(r, flexible))?
                };
                if flexible {
                    r.skip_tagged_fields()?;
                }
                Ok(DeleteAclsFilterResult { error_code, error_message, matching_acls })
            };
            let filter_results = if flexible {
                r.read_compact_array(read_filter_result)?
            } else {
                r.read_legacy_array(read_filter_result)?
            };
            if flexible {
                r.skip_tagged_fields()?;
            }
            Ok(DeleteAclsResponse { throttle_time_ms, filter_results })
        })
    }

    #[allow(dead_code)]
    const fn _api() -> (ApiKey, ApiKey, ApiKey) {
        (ApiKey::DescribeAcls, ApiKey::CreateAcls, ApiKey::DeleteAcls)
    }
}

pub mod describe_groups {
    use super::*;
    use crate::protocol::ApiKey;

    #[derive(Debug, Clone)]
    pub struct DescribeGroupsRequest {
        pub group_ids: Vec<String>,
        pub include_authorized_operations: bool,
    }

    #[derive(Debug, Clone)]
    pub struct DescribedGroupMember {
        pub member_id: String,
        pub client_id: String,
        pub client_host: String,
        pub member_metadata: Option<bytes::Bytes>,
        pub member_assignment: Option<bytes::Bytes>,
    }

    #[derive(Debug, Clone)]
    pub struct DescribedGroup {
        pub error_code: i16,
        pub group_id: String,
        pub group_state: String,
        pub protocol_type: String,
        pub protocol_data: String,
        pub members: Vec<DescribedGroupMember>,
    }

    #[derive(Debug, Clone)]
    pub struct DescribeGroupsResponse {
        pub throttle_time_ms: i32,
        pub groups: Vec<DescribedGroup>,
    }

    pub fn create_request(header: &RequestHeader, req: &DescribeGroupsRequest) -> Result<Vec<u8>> {
        write_header_and_frame(header, |w, flexible| {
            if flexible {
                w.put_compact_array(&req.group_ids, |w, g| {
                    w.put_compact_string(Some(g));
                    Ok(())
                })?;
            } else {
                w.put_legacy_array(&req.group_ids, |w, g| {
                    w.put_legacy_string(Some(g));
                    Ok(())
                })?;
            }
            w.put_bool(req.include_authorized_operations);
            if flexible {
                w.put_tagged_fields();
            }
            Ok(())
        })
    }

    pub fn parse_response(body: &[u8], api_version: i16) -> Result<DescribeGroupsResponse> {
        let flexible = api_version >= 5;
        read_header_then(body, flexible, |r| {
            let throttle_time_ms = if api_version >= 1 { r.read_i32()? } else { 0 };
            let read_member = |r: &mut Reader<'_>| -> Result<DescribedGroupMember> {
                let member_id = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? }.unwrap_or_default();
                let client_id = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? }.unwrap_or_default();
                let client_host = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? }.unwrap_or_default();
                let member_metadata = if flexible { r.read_compact_bytes()? } else { r.read_legacy_bytes()? };
                let member_assignment = if flexible { r.read_compact_bytes()? } else { r.read_legacy_bytes()? };
                if flexible {
                    r.skip_tagged_fields()?;
                }
                Ok(DescribedGroupMember { member_id, client_id, client_host, member_metadata, member_assignment })
            };
            let read_group = |r: &mut Reader<'_>| -> Result<DescribedGroup> {
                let error_code = r.read_i16()?;
                let group_id = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? }.unwrap_or_default();
                let group_state = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? }.unwrap_or_default();
                let protocol_type = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? }.unwrap_or_default();
                let protocol_data = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? }.unwrap_or_default();
                let members = if flexible {
                    r.read_compact_array(read_member)?
                } else {
                    r.read_legacy_array(read_member)?
                };
                if flexible {
                    r.skip_tagged_fields()?;
                }
                Ok(DescribedGroup { error_code, group_id, group_state, protocol_type, protocol_data, members })
            };
            let groups = if flexible {
                r.read_compact_array(read_group)?
            } else {
                r.read_legacy_array(read_group)?
            };
            if flexible {
                r.skip_tagged_fields()?;
            }
            Ok(DescribeGroupsResponse { throttle_time_ms, groups })
        })
    }

    #[allow(dead_code)]
    const fn _api() -> ApiKey {
        ApiKey::DescribeGroups
    }
}

pub mod delete_records {
    use super::*;
    use crate::protocol::ApiKey;

    #[derive(Debug, Clone)]
    pub struct DeleteRecordsPartition {
        pub partition: i32,
        pub offset: i64,
    }

    #[derive(Debug, Clone)]
    pub struct DeleteRecordsTopic {
        pub topic: String,
        pub partitions: Vec<DeleteRecordsPartition>,
    }

    #[derive(Debug, Clone)]
    pub struct DeleteRecordsRequest {
        pub topics: Vec<DeleteRecordsTopic>,
        pub timeout_ms: i32,
    }

    #[derive(Debug, Clone)]
    pub struct DeletedPartitionResult {
        pub partition: i32,
        pub low_watermark: i64,
        pub error_code: i16,
    }

    #[derive(Debug, Clone)]
    pub struct DeleteRecordsTopicResult {
        pub topic: String,
        pub partitions: Vec<DeletedPartitionResult>,
    }

    #[derive(Debug, Clone)]
    pub struct DeleteRecordsResponse {
        pub throttle_time_ms: i32,
        pub topics: Vec<DeleteRecordsTopicResult>,
    }

    pub fn create_request(header: &RequestHeader, req: &DeleteRecordsRequest) -> Result<Vec<u8>> {
        write_header_and_frame(header, |w, flexible| {
            let write_partition = |w: &mut Writer, p: &DeleteRecordsPartition| -> Result<()> {
                w.put_i32(p.partition);
                w.put_i64(p.offset);
                if flexible {
                    w.put_tagged_fields();
                }
                Ok(())
            };
            let write_topic = |w: &mut Writer, t: &DeleteRecordsTopic| -> Result<()> {
                if flexible {
                    w.put_compact_string(Some(&t.topic));
                    w.put_compact_array(&t.partitions, write_partition)?;
                    w.put_tagged_fields();
                } else {
                    w.put_legacy_string(Some(&t.topic));
                    w.put_legacy_array(&t.partitions, write_partition)?;
                }
                Ok(())
            };
            if flexible {
                w.put_compact_array(&req.topics, write_topic)?;
            } else {
                w.put_legacy_array(&req.topics, write_topic)?;
            }
            w.put_i32(req.timeout_ms);
            if flexible {
                w.put_tagged_fields();
            }
            Ok(())
        })
    }

    pub fn parse_response(body: &[u8], api_version: i16) -> Result<DeleteRecordsResponse> {
        let flexible = api_version >= 2;
        read_header_then(body, flexible, |r| {
            let throttle_time_ms = r.read_i32()?;
            let read_partition = |r: &mut Reader<'_>| -> Result<DeletedPartitionResult> {
                let partition = r.read_i32()?;
                let low_watermark = r.read_i64()?;
                let error_code = r.read_i16()?;
                if flexible {
                    r.skip_tagged_fields()?;
                }
                Ok(DeletedPartitionResult { partition, low_watermark, error_code })
            };
            let read_topic = |r: &mut Reader<'_>| -> Result<DeleteRecordsTopicResult> {
                let topic = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? }.unwrap_or_default();
                let partitions = if flexible {
                    r.read_compact_array(read_partition)?
                } else {
                    r.read_legacy_array(read_partition)?
                };
                if flexible {
                    r.skip_tagged_fields()?;
                }
                Ok(DeleteRecordsTopicResult { topic, partitions })
            };
            let topics = if flexible {
                r.read_compact_array(read_topic)?
            } else {
                r.read_legacy_array(read_topic)?
            };
            if flexible {
                r.skip_tagged_fields()?;
            }
            Ok(DeleteRecordsResponse { throttle_time_ms, topics })
        })
    }

    #[allow(dead_code)]
    const fn _api() -> ApiKey {
        ApiKey::DeleteRecords
    }
}

pub mod offset_delete {
    use super::*;
    use crate::protocol::ApiKey;

    #[derive(Debug, Clone)]
    pub struct OffsetDeletePartition {
        pub partition_index: i32,
    }

    #[derive(Debug, Clone)]
    pub struct OffsetDeleteTopic {
        pub name: String,
        pub partitions: Vec<OffsetDeletePartition>,
    }

    #[derive(Debug, Clone)]
    pub struct OffsetDeleteRequest {
        pub group_id: String,
        pub topics: Vec<OffsetDeleteTopic>,
    }

    #[derive(Debug, Clone)]
    pub struct OffsetDeletePartitionResult {
        pub partition_index: i32,
        pub error_code: i16,
    }

    #[derive(Debug, Clone)]
    pub struct OffsetDeleteTopicResult {
        pub name: String,
        pub partitions: Vec<OffsetDeletePartitionResult>,
    }

    #[derive(Debug, Clone)]
    pub struct OffsetDeleteResponse {
        pub error_code: i16,
        pub throttle_time_ms: i32,
        pub topics: Vec<OffsetDeleteTopicResult>,
    }

    // OffsetDelete never grew a flexible version; it stays legacy-encoded at every version.
    pub fn create_request(header: &RequestHeader, req: &OffsetDeleteRequest) -> Result<Vec<u8>> {
        let mut w = Writer::with_capacity(128);
        header.write(&mut w);
        w.put_legacy_string(Some(&req.group_id));
        w.put_legacy_array(&req.topics, |w, t| {
            w.put_legacy_string(Some(&t.name));
            w.put_legacy_array(&t.partitions, |w, p| {
                w.put_i32(p.partition_index);
                Ok(())
            })?;
            Ok(())
        })?;
        Ok(w.prepend_length().to_vec())
    }

    pub fn parse_response(body: &[u8], _api_version: i16) -> Result<OffsetDeleteResponse> {
        let mut r = Reader::new(body);
        ResponseHeader::read(&mut r, false)?;
        let error_code = r.read_i16()?;
        let throttle_time_ms = r.read_i32()?;
        let topics = r.read_legacy_array(|r| {
            let name = r.read_legacy_string()?.unwrap_or_default();
            let partitions = r.read_legacy_array(|r| {
                let partition_index = r.read_i32()?;
                let error_code = r.read_i16()?;
                Ok(OffsetDeletePartitionResult { partition_index, error_code })
            })?;
            Ok(OffsetDeleteTopicResult { name, partitions })
        })?;
        Ok(OffsetDeleteResponse { error_code, throttle_time_ms, topics })
    }

    #[allow(dead_code)]
    const fn _api() -> ApiKey {
        ApiKey::OffsetDelete
    }
}

pub mod log_dirs {
    use super::*;
    use crate::protocol::ApiKey;

    #[derive(Debug, Clone)]
    pub struct DescribeLogDirsTopic {
        pub topic: String,
        pub partitions: Vec<i32>,
    }

    #[derive(Debug, Clone, Default)]
    pub struct DescribeLogDirsRequest {
        pub topics: Option<Vec<DescribeLogDirsTopic>>,
    }

    #[derive(Debug, Clone)]
    pub struct LogDirPartition {
        pub partition_index: i32,
        pub partition_size: i64,
        pub offset_lag: i64,
        pub is_future_key: bool,
    }

    #[derive(Debug, Clone)]
    pub struct LogDirTopic {
        pub name: String,
        pub partitions: Vec<LogDirPartition>,
    }

    #[derive(Debug, Clone)]
    pub struct LogDirResult {
        pub error_code: i16,
        pub log_dir: String,
        pub topics: Vec<LogDirTopic>,
    }

    #[derive(Debug, Clone)]
    pub struct DescribeLogDirsResponse {
        pub throttle_time_ms: i32,
        pub results: Vec<LogDirResult>,
    }

    pub fn create_request(header: &RequestHeader, req: &DescribeLogDirsRequest) -> Result<Vec<u8>> {
        write_header_and_frame(header, |w, flexible| {
            let write_topic = |w: &mut Writer, t: &DescribeLogDirsTopic| -> Result<()> {
                if flexible {
                    w.put_compact_string(Some(&t.topic));
                    w.put_compact_array(&t.partitions, |w, p| {
                        w.put_i32(*p);
                        Ok(())
                    })?;
                    w.put_tagged_fields();
                } else {
                    w.put_legacy_string(Some(&t.topic));
                    w.put_legacy_array(&t.partitions, |w, p| {
                        w.put_i32(*p);
                        Ok(())
                    })?;
                }
                Ok(())
            };
            match &req.topics {
                Some(topics) => {
                    if flexible {
                        w.put_compact_array(topics, write_topic)?;
                    } else {
                        w.put_legacy_array(topics, write_topic)?;
                    }
                }
                None => {
                    if flexible {
                        w.put_unsigned_varint(0);
                    } else {
                        w.put_i32(-1);
                    }
                }
            }
            if flexible {
                w.put_tagged_fields();
            }
            Ok(())
        })
    }

    pub fn parse_response(body: &[u8], api_version: i16) -> Result<DescribeLogDirsResponse> {
        let flexible = api_version >= 2;
        read_header_then(body, flexible, |r| {
            let throttle_time_ms = r.read_i32()?;
            let read_partition = |r: &mut Reader<'_>| -> Result<LogDirPartition> {
                let partition_index = r.read_i32()?;
                let partition_size = r.read_i64()?;
                let offset_lag = r.read_i64()?;
                let is_future_key = r.read_bool()?;
                if flexible {
                    r.skip_tagged_fields()?;
                }
                Ok(LogDirPartition { partition_index, partition_size, offset_lag, is_future_key })
            };
            let read_topic = |r: &mut Reader<'_>| -> Result<LogDirTopic> {
                let name = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? }.unwrap_or_default();
                let partitions = if flexible {
                    r.read_compact_array(read_partition)?
                } else {
                    r.read_legacy_array(read_partition)?
                };
                if flexible {
                    r.skip_tagged_fields()?;
                }
                Ok(LogDirTopic { name, partitions })
            };
            let read_result = |r: &mut Reader<'_>| -> Result<LogDirResult> {
                let error_code = r.read_i16()?;
                let log_dir = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? }.unwrap_or_default();
                let topics = if flexible {
                    r.read_compact_array(read_topic)?
                } else {
                    r.read_legacy_array(read_topic)?
                };
                if flexible {
                    r.skip_tagged_fields()?;
                }
                Ok(LogDirResult { error_code, log_dir, topics })
            };
            let results = if flexible {
                r.read_compact_array(read_result)?
            } else {
                r.read_legacy_array(read_result)?
            };
            if flexible {
                r.skip_tagged_fields()?;
            }
            Ok(DescribeLogDirsResponse { throttle_time_ms, results })
        })
    }

    #[allow(dead_code)]
    const fn _api() -> ApiKey {
        ApiKey::DescribeLogDirs
    }
}

pub mod reassignments {
    use super::*;
    use crate::protocol::ApiKey;

    #[derive(Debug, Clone)]
    pub struct PartitionReplicas {
        pub partition_index: i32,
        pub replicas: Option<Vec<i32>>,
    }

    #[derive(Debug, Clone)]
    pub struct AlterReassignmentsTopic {
        pub name: String,
        pub partitions: Vec<PartitionReplicas>,
    }

    #[derive(Debug, Clone)]
    pub struct AlterPartitionReassignmentsRequest {
        pub timeout_ms: i32,
        pub topics: Vec<AlterReassignmentsTopic>,
    }

    #[derive(Debug, Clone)]
    pub struct ReassignmentPartitionResult {
        pub partition_index: i32,
        pub error_code: i16,
        pub error_message: Option<String>,
    }

    #[derive(Debug, Clone)]
    pub struct AlterReassignmentsTopicResult {
        pub name: String,
        pub partitions: Vec<ReassignmentPartitionResult>,
    }

    #[derive(Debug, Clone)]
    pub struct AlterPartitionReassignmentsResponse {
        pub throttle_time_ms: i32,
        pub error_code: i16,
        pub error_message: Option<String>,
        pub responses: Vec<AlterReassignmentsTopicResult>,
    }

    pub fn alter_create_request(header: &RequestHeader, req: &AlterPartitionReassignmentsRequest) -> Result<Vec<u8>> {
        write_header_and_frame(header, |w, flexible| {
            w.put_i32(req.timeout_ms);
            let write_partition = |w: &mut Writer, p: &PartitionReplicas| -> Result<()> {
                w.put_i32(p.partition_index);
                match &p.replicas {
                    Some(replicas) => {
                        if flexible {
                            w.put_compact_array(replicas, |w, r| {
                                w.put_i32(*r);
                                Ok(())
                            })?;
                        } else {
                            w.put_legacy_array(replicas, |w, r| {
                                w.put_i32(*r);
                                Ok(())
                            })?;
                        }
                    }
                    None => {
                        if flexible {
                            w.put_unsigned_varint(0);
                        } else {
                            w.put_i32(-1);
                        }
                    }
                }
                if flexible {
                    w.put_tagged_fields();
                }
                Ok(())
            };
            let write_topic = |w: &mut Writer, t: &AlterReassignmentsTopic| -> Result<()> {
                if flexible {
                    w.put_compact_string(Some(&t.name));
                    w.put_compact_array(&t.partitions, write_partition)?;
                    w.put_tagged_fields();
                } else {
                    w.put_legacy_string(Some(&t.name));
                    w.put_legacy_array(&t.partitions, write_partition)?;
                }
                Ok(())
            };
            if flexible {
                w.put_compact_array(&req.topics, write_topic)?;
            } else {
                w.put_legacy_array(&req.topics, write_topic)?;
            }
            if flexible {
                w.put_tagged_fields();
            }
            Ok(())
        })
    }

    pub fn alter_parse_response(body: &[u8], api_version: i16) -> Result<AlterPartitionReassignmentsResponse> {
        let flexible = api_version >= 0;
        read_header_then(body, flexible, |r| {
            let throttle_time_ms = r.read_i32()?;
            let error_code = r.read_i16()?;
            let error_message = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? };
            let read_partition = |r: &mut Reader<'_>| -> Result<ReassignmentPartitionResult> {
                let partition_index = r.read_i32()?;
                let error_code = r.read_i16()?;
                let error_message = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? };
                if flexible {
                    r.skip_tagged_fields()?;
                }
                Ok(ReassignmentPartitionResult { partition_index, error_code, error_message })
            };
            let read_topic = |r: &mut Reader<'_>| -> Result<AlterReassignmentsTopicResult> {
                let name = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? }.unwrap_or_default();
                let partitions = if flexible {
                    r.read_compact_array(read_partition)?
                } else {
                    r.read_legacy_array(read_partition)?
                };
                if flexible {
                    r.skip_tagged_fields()?;
                }
                Ok(AlterReassignmentsTopicResult { name, partitions })
            };
            let responses = if flexible {
                r.read_compact_array(read_topic)?
            } else {
                r.read_legacy_array(read_topic)?
            };
            if flexible {
                r.skip_tagged_fields()?;
            }
            Ok(AlterPartitionReassignmentsResponse { throttle_time_ms, error_code, error_message, responses })
        })
    }

    #[derive(Debug, Clone)]
    pub struct ListReassignmentsTopic {
        pub name: String,
        pub partition_indexes: Vec<i32>,
    }

    #[derive(Debug, Clone, Default)]
    pub struct ListPartitionReassignmentsRequest {
        pub timeout_ms: i32,
        pub topics: Option<Vec<ListReassignmentsTopic>>,
    }

    #[derive(Debug, Clone)]
    pub struct OngoingPartitionReassignment {
        pub partition_index: i32,
        pub replicas: Vec<i32>,
        pub adding_replicas: Vec<i32>,
        pub removing_replicas: Vec<i32>,
    }

    #[derive(Debug, Clone)]
    pub struct OngoingTopicReassignment {
        pub name: String,
        pub partitions: Vec<OngoingPartitionReassignment>,
    }

    #[derive(Debug, Clone)]
    pub struct ListPartitionReassignmentsResponse {
        pub throttle_time_ms: i32,
        pub error_code: i16,
        pub error_message: Option<String>,
        pub topics: Vec<OngoingTopicReassignment>,
    }

    pub fn list_create_request(header: &RequestHeader, req: &ListPartitionReassignmentsRequest) -> Result<Vec<u8>> {
        write_header_and_frame(header, |w, flexible| {
            w.put_i32(req.timeout_ms);
            let write_topic = |w: &mut Writer, t: &ListReassignmentsTopic| -> Result<()> {
                if flexible {
                    w.put_compact_string(Some(&t.name));
                    w.put_compact_array(&t.partition_indexes, |w, p| {
                        w.put_i32(*p);
                        Ok(())
                    })?;
                    w.put_tagged_fields();
                } else {
                    w.put_legacy_string(Some(&t.name));
                    w.put_legacy_array(&t.partition_indexes, |w, p| {
                        w.put_i32(*p);
                        Ok(())
                    })?;
                }
                Ok(())
            };
            match &req.topics {
                Some(topics) => {
                    if flexible {
                        w.put_compact_array(topics, write_topic)?;
                    } else {
                        w.put_legacy_array(topics, write_topic)?;
                    }
                }
                None => {
                    if flexible {
                        w.put_unsigned_varint(0);
                    } else {
                        w.put_i32(-1);
                    }
                }
            }
            if flexible {
                w.put_tagged_fields();
            }
            Ok(())
        })
    }

    pub fn list_parse_response(body: &[u8], api_version: i16) -> Result<ListPartitionReassignmentsResponse> {
        let flexible = api_version >= 0;
        read_header_then(body, flexible, |r| {
            let throttle_time_ms = r.read_i32()?;
            let error_code = r.read_i16()?;
            let error_message = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? };
            let read_ints = |r: &mut Reader<'_>| -> Result<Vec<i32>> {
                if flexible {
                    r.read_compact_array(|r| r.read_i32())
                } else {
                    r.read_legacy_array(|r| r.read_i32())
                }
            };
            let read_partition = |r: &mut Reader<'_>| -> Result<OngoingPartitionReassignment> {
                let partition_index = r.read_i32()?;
                let replicas = read_ints(r)?;
                let adding_replicas = read_ints(r)?;
                let removing_replicas = read_ints(r)?;
                if flexible {
                    r.skip_tagged_fields()?;
                }
                Ok(OngoingPartitionReassignment { partition_index, replicas, adding_replicas, removing_replicas })
            };
            let read_topic = |r: &mut Reader<'_>| -> Result<OngoingTopicReassignment> {
                let name = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? }.unwrap_or_default();
                let partitions = if flexible {
                    r.read_compact_array(read_partition)?
                } else {
                    r.read_legacy_array(read_partition)?
                };
                if flexible {
                    r.skip_tagged_fields()?;
                }
                Ok(OngoingTopicReassignment { name, partitions })
            };
            let topics = if flexible {
                r.read_compact_array(read_topic)?
            } else {
                r.read_legacy_array(read_topic)?
            };
            if flexible {
                r.skip_tagged_fields()?;
            }
            Ok(ListPartitionReassignmentsResponse { throttle_time_ms, error_code, error_message, topics })
        })
    }

    #[allow(dead_code)]
    const fn _api() -> (ApiKey, ApiKey) {
        (ApiKey::AlterPartitionReassignments, ApiKey::ListPartitionReassignments)
    }
}

/// Delegation tokens: `CreateDelegationToken`/`RenewDelegationToken`/`ExpireDelegationToken`/
/// `DescribeDelegationToken`, all flexible from v2 onward.
pub mod delegation_tokens {
    use super::*;
    use crate::protocol::ApiKey;
    use bytes::Bytes;

    #[derive(Debug, Clone)]
    pub struct TokenHolder {
        pub principal_type: String,
        pub principal_name: String,
    }

    #[derive(Debug, Clone)]
    pub struct CreateDelegationTokenRequest {
        pub renewers: Vec<TokenHolder>,
        pub max_lifetime_ms: i64,
    }

    #[derive(Debug, Clone)]
    pub struct CreateDelegationTokenResponse {
        pub error_code: i16,
        pub principal_type: String,
        pub principal_name: String,
        pub issue_timestamp: i64,
        pub expiry_timestamp: i64,
        pub max_timestamp: i64,
        pub token_id: String,
        pub hmac: Bytes,
        pub throttle_time_ms: i32,
    }

    fn write_holder(w: &mut Writer, flexible: bool, h: &TokenHolder) -> Result<()> {
        if flexible {
            w.put_compact_string(Some(&h.principal_type));
            w.put_compact_string(Some(&h.principal_name));
            w.put_tagged_fields();
        } else {
            w.put_legacy_string(Some(&h.principal_type));
            w.put_legacy_string(Some(&h.principal_name));
        }
        Ok(())
    }

    pub fn create_create_request(header: &RequestHeader, req: &CreateDelegationTokenRequest) -> Result<Vec<u8>> {
        write_header_and_frame(header, |w, flexible| {
            if flexible {
                w.put_compact_array(&req.renewers, |w, h| write_holder(w, flexible, h))?;
            } else {
                w.put_legacy_array(&req.renewers, |w, h| write_holder(w, flexible, h))?;
            }
            w.put_i64(req.max_lifetime_ms);
            if flexible {
                w.put_tagged_fields();
            }
            Ok(())
        })
    }

    pub fn create_parse_response(body: &[u8], api_version: i16) -> Result<CreateDelegationTokenResponse> {
        let flexible = api_version >= 2;
        read_header_then(body, flexible, |r| {
            let error_code = r.read_i16()?;
            let principal_type = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? }.unwrap_or_default();
            let principal_name = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? }.unwrap_or_default();
            let issue_timestamp = r.read_i64()?;
            let expiry_timestamp = r.read_i64()?;
            let max_timestamp = r.read_i64()?;
            let token_id = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? }.unwrap_or_default();
            let hmac = if flexible { r.read_compact_bytes()? } else { r.read_legacy_bytes()? }.unwrap_or_default();
            let throttle_time_ms = r.read_i32()?;
            if flexible {
                r.skip_tagged_fields()?;
            }
            Ok(CreateDelegationTokenResponse {
                error_code,
                principal_type,
                principal_name,
                issue_timestamp,
                expiry_timestamp,
                max_timestamp,
                token_id,
                hmac,
                throttle_time_ms,
            })
        })
    }

    #[derive(Debug, Clone)]
    pub struct RenewOrExpireDelegationTokenRequest {
        pub hmac: Bytes,
        pub period_ms: i64,
    }

    #[derive(Debug, Clone)]
    pub struct RenewOrExpireDelegationTokenResponse {
        pub error_code: i16,
        pub expiry_timestamp: i64,
        pub throttle_time_ms: i32,
    }

    fn create_period_request(header: &RequestHeader, req: &RenewOrExpireDelegationTokenRequest) -> Result<Vec<u8>> {
        write_header_and_frame(header, |w, flexible| {
            if flexible {
                w.put_compact_bytes(Some(&req.hmac));
            } else {
                w.put_legacy_bytes(Some(&req.hmac));
            }
            w.put_i64(req.period_ms);
            if flexible {
                w.put_tagged_fields();
            }
            Ok(())
        })
    }

    fn parse_period_response(body: &[u8], api_version: i16) -> Result<RenewOrExpireDelegationTokenResponse> {
        let flexible = api_version >= 2;
        read_header_then(body, flexible, |r| {
            let error_code = r.read_i16()?;
            let expiry_timestamp = r.read_i64()?;
            let throttle_time_ms = r.read_i32()?;
            if flexible {
                r.skip_tagged_fields()?;
            }
            Ok(RenewOrExpireDelegationTokenResponse { error_code, expiry_timestamp, throttle_time_ms })
        })
    }

    pub fn renew_create_request(header: &RequestHeader, req: &RenewOrExpireDelegationTokenRequest) -> Result<Vec<u8>> {
        create_period_request(header, req)
    }

    pub fn renew_parse_response(body: &[u8], api_version: i16) -> Result<RenewOrExpireDelegationTokenResponse> {
        parse_period_response(body, api_version)
    }

    pub fn expire_create_request(header: &RequestHeader, req: &RenewOrExpireDelegationTokenRequest) -> Result<Vec<u8>> {
        create_period_request(header, req)
    }

    pub fn expire_parse_response(body: &[u8], api_version: i16) -> Result<RenewOrExpireDelegationTokenResponse> {
        parse_period_response(body, api_version)
    }

    #[derive(Debug, Clone, Default)]
    pub struct DescribeDelegationTokenRequest {
        pub owners: Option<Vec<TokenHolder>>,
    }

    #[derive(Debug, Clone)]
    pub struct DescribedToken {
        pub principal_type: String,
        pub principal_name: String,
        pub issue_timestamp: i64,
        pub expiry_timestamp: i64,
        pub max_timestamp: i64,
        pub token_id: String,
        pub hmac: Bytes,
        pub renewers: Vec<TokenHolder>,
    }

    #[derive(Debug, Clone)]
    pub struct DescribeDelegationTokenResponse {
        pub error_code: i16,
        pub tokens: Vec<DescribedToken>,
        pub throttle_time_ms: i32,
    }

    pub fn describe_create_request(header: &RequestHeader, req: &DescribeDelegationTokenRequest) -> Result<Vec<u8>> {
        write_header_and_frame(header, |w, flexible| {
            match &req.owners {
                Some(owners) => {
                    if flexible {
                        w.put_compact_array(owners, |w, h| write_holder(w, flexible, h))?;
                    } else {
                        w.put_legacy_array(owners, |w, h| write_holder(w, flexible, h))?;
                    }
                }
                None => {
                    if flexible {
                        w.put_unsigned_varint(0);
                    } else {
                        w.put_i32(-1);
                    }
                }
            }
            if flexible {
                w.put_tagged_fields();
            }
            Ok(())
        })
    }

    pub fn describe_parse_response(body: &[u8], api_version: i16) -> Result<DescribeDelegationTokenResponse> {
        let flexible = api_version >= 2;
        read_header_then(body, flexible, |r| {
            let error_code = r.read_i16()?;
            let read_holder = |r: &mut Reader<'_>| -> Result<TokenHolder> {
                let principal_type = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? }.unwrap_or_default();
                let principal_name = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? }.unwrap_or_default();
                if flexible {
                    r.skip_tagged_fields()?;
                }
                Ok(TokenHolder { principal_type, principal_name })
            };
            let read_token = |r: &mut Reader<'_>| -> Result<DescribedToken> {
                let principal_type = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? }.unwrap_or_default();
                let principal_name = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? }.unwrap_or_default();
                let issue_timestamp = r.read_i64()?;
                let expiry_timestamp = r.read_i64()?;
                let max_timestamp = r.read_i64()?;
                let token_id = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? }.unwrap_or_default();
                let hmac = if flexible { r.read_compact_bytes()? } else { r.read_legacy_bytes()? }.unwrap_or_default();
                let renewers = if flexible {
                    r.read_compact_array(read_holder)?
                } else {
                    r.read_legacy_array(read_holder)?
                };
                if flexible {
                    r.skip_tagged_fields()?;
                }
                Ok(DescribedToken {
                    principal_type,
                    principal_name,
                    issue_timestamp,
                    expiry_timestamp,
                    max_timestamp,
                    token_id,
                    hmac,
                    renewers,
                })
            };
            let tokens = if flexible {
                r.read_compact_array(read_token)?
            } else {
                r.read_legacy_array(read_token)?
            };
            let throttle_time_ms = r.read_i32()?;
            if flexible {
                r.skip_tagged_fields()?;
            }
            Ok(DescribeDelegationTokenResponse { error_code, tokens, throttle_time_ms })
        })
    }

    #[allow(dead_code)]
    const fn _api() -> (ApiKey, ApiKey, ApiKey, ApiKey) {
        (
            ApiKey::CreateDelegationToken,
            ApiKey::RenewDelegationToken,
            ApiKey::ExpireDelegationToken,
            ApiKey::DescribeDelegationToken,
        )
    }
}

pub mod quotas {
    use super::*;
    use crate::protocol::ApiKey;

    #[derive(Debug, Clone)]
    pub struct QuotaComponent {
        pub entity_type: String,
        pub match_type: i8,
        pub match_value: Option<String>,
    }

    #[derive(Debug, Clone)]
    pub struct DescribeClientQuotasRequest {
        pub components: Vec<QuotaComponent>,
        pub strict: bool,
    }

    #[derive(Debug, Clone)]
    pub struct QuotaEntityEntry {
        pub entity_type: String,
        pub entity_name: Option<String>,
    }

    #[derive(Debug, Clone)]
    pub struct QuotaValue {
        pub key: String,
        pub value: f64,
    }

    #[derive(Debug, Clone)]
    pub struct QuotaEntry {
        pub entity: Vec<QuotaEntityEntry>,
        pub values: Vec<QuotaValue>,
    }

    #[derive(Debug, Clone)]
    pub struct DescribeClientQuotasResponse {
        pub throttle_time_ms: i32,
        pub error_code: i16,
        pub error_message: Option<String>,
        pub entries: Vec<QuotaEntry>,
    }

    pub fn describe_create_request(header: &RequestHeader, req: &DescribeClientQuotasRequest) -> Result<Vec<u8>> {
        write_header_and_frame(header, |w, flexible| {
            let write_component = |w: &mut Writer, c: &QuotaComponent| -> Result<()> {
                if flexible {
                    w.put_compact_string(Some(&c.entity_type));
                } else {
                    w.put_legacy_string(Some(&c.entity_type));
                }
                w.put_i8(c.match_type);
                if flexible {
                    w.put_compact_string(c.match_value.as_deref());
                    w.put_tagged_fields();
                } else {
                    w.put_legacy_string(c.match_value.as_deref());
                }
                Ok(())
            };
            if flexible {
                w.put_compact_array(&req.components, write_component)?;
            } else {
                w.put_legacy_array(&req.components, write_component)?;
            }
            w.put_bool(req.strict);
            if flexible {
                w.put_tagged_fields();
            }
            Ok(())
        })
    }

    pub fn describe_parse_response(body: &[u8], api_version: i16) -> Result<DescribeClientQuotasResponse> {
        let flexible = api_version >= 1;
        read_header_then(body, flexible, |r| {
            let throttle_time_ms = r.read_i32()?;
            let error_code = r.read_i16()?;
            let error_message = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? };
            let read_entity = |r: &mut Reader<'_>| -> Result<QuotaEntityEntry> {
                let entity_type = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? }.unwrap_or_default();
                let entity_name = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? };
                if flexible {
                    r.skip_tagged_fields()?;
                }
                Ok(QuotaEntityEntry { entity_type, entity_name })
            };
            let read_value = |r: &mut Reader<'_>| -> Result<QuotaValue> {
                let key = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? }.unwrap_or_default();
                let value = r.read_f64()?;
                if flexible {
                    r.skip_tagged_fields()?;
                }
                Ok(QuotaValue { key, value })
            };
            let read_entry = |r: &mut Reader<'_>| -> Result<QuotaEntry> {
                let entity = if flexible {
                    r.read_compact_array(read_entity)?
                } else {
                    r.read_legacy_array(read_entity)?
                };
                let values = if flexible {
                    r.read_compact_array(read_value)?
                } else {
                    r.read_legacy_array(read_value)?
                };
                if flexible {
                    r.skip_tagged_fields()?;
                }
                Ok(QuotaEntry { entity, values })
            };
            let entries = if flexible {
                r.read_compact_array(read_entry)?
            } else {
                r.read_legacy_array(read_entry)?
            };
            if flexible {
                r.skip_tagged_fields()?;
            }
            Ok(DescribeClientQuotasResponse { throttle_time_ms, error_code, error_message, entries })
        })
    }

    #[derive(Debug, Clone)]
    pub struct QuotaOp {
        pub key: String,
        pub value: f64,
        pub remove: bool,
    }

    #[derive(Debug, Clone)]
    pub struct AlterQuotaEntry {
        pub entity: Vec<QuotaEntityEntry>,
        pub ops: Vec<QuotaOp>,
    }

    #[derive(Debug, Clone)]
    pub struct AlterClientQuotasRequest {
        pub entries: Vec<AlterQuotaEntry>,
        pub validate_only: bool,
    }

    #[derive(Debug, Clone)]
    pub struct AlterQuotaEntryResult {
        pub error_code: i16,
        pub error_message: Option<String>,
        pub entity: Vec<QuotaEntityEntry>,
    }

    #[derive(Debug, Clone)]
    pub struct AlterClientQuotasResponse {
        pub throttle_time_ms: i32,
        pub entries: Vec<AlterQuotaEntryResult>,
    }

    pub fn alter_create_request(header: &RequestHeader, req: &AlterClientQuotasRequest) -> Result<Vec<u8>> {
        write_header_and_frame(header, |w, flexible| {
            let write_entity = |w: &mut Writer, e: &QuotaEntityEntry| -> Result<()> {
                if flexible {
                    w.put_compact_string(Some(&e.entity_type));
                    w.put_compact_string(e.entity_name.as_deref());
                    w.put_tagged_fields();
                } else {
                    w.put_legacy_string(Some(&e.entity_type));
                    w.put_legacy_string(e.entity_name.as_deref());
                }
                Ok(())
            };
            let write_op = |w: &mut Writer, o: &QuotaOp| -> Result<()> {
                if flexible {
                    w.put_compact_string(Some(&o.key));
                } else {
                    w.put_legacy_string(Some(&o.key));
                }
                w.put_f64(o.value);
                w.put_bool(o.remove);
                if flexible {
                    w.put_tagged_fields();
                }
                Ok(())
            };
            let write_entry = |w: &mut Writer, e: &AlterQuotaEntry| -> Result<()> {
                if flexible {
                    w.put_compact_array(&e.entity, write_entity)?;
                    w.put_compact_array(&e.ops, write_op)?;
                    w.put_tagged_fields();
                } else {
                    w.put_legacy_array(&e.entity, write_entity)?;
                    w.put_legacy_array(&e.ops, write_op)?;
                }
                Ok(())
            };
            if flexible {
                w.put_compact_array(&req.entries, write_entry)?;
            } else {
                w.put_legacy_array(&req.entries, write_entry)?;
            }
            w.put_bool(req.validate_only);
            if flexible {
                w.put_tagged_fields();
            }
            Ok(())
        })
    }

    pub fn alter_parse_response(body: &[u8], api_version: i16) -> Result<AlterClientQuotasResponse> {
        let flexible = api_version >= 1;
        read_header_then(body, flexible, |r| {
            let throttle_time_ms = r.read_i32()?;
            let read_entity = |r: &mut Reader<'_>| -> Result<QuotaEntityEntry> {
                let entity_type = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? }.unwrap_or_default();
                let entity_name = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? };
                if flexible {
                    r.skip_tagged_fields()?;
                }
                Ok(QuotaEntityEntry { entity_type, entity_name })
            };
            let read_entry = |r: &mut Reader<'_>| -> Result<AlterQuotaEntryResult> {
                let error_code = r.read_i16()?;
                let error_message = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? };
                let entity = if flexible {
                    r.read_compact_array(read_entity)?
                } else {
                    r.read_legacy_array(read_entity)?
                };
                if flexible {
                    r.skip_tagged_fields()?;
                }
                Ok(AlterQuotaEntryResult { error_code, error_message, entity })
            };
            let entries = if flexible {
                r.read_compact_array(read_entry)?
            } else {
                r.read_legacy_array(read_entry)?
            };
            if flexible {
                r.skip_tagged_fields()?;
            }
            Ok(AlterClientQuotasResponse { throttle_time_ms, entries })
        })
    }

    #[allow(dead_code)]
    const fn _api() -> (ApiKey, ApiKey) {
        (ApiKey::DescribeClientQuotas, ApiKey::AlterClientQuotas)
    }
}

pub mod features {
    use super::*;
    use crate::protocol::ApiKey;

    #[derive(Debug, Clone, Default)]
    pub struct DescribeFeaturesRequest;

    #[derive(Debug, Clone)]
    pub struct SupportedFeature {
        pub name: String,
        pub min_version: i16,
        pub max_version: i16,
    }

    #[derive(Debug, Clone)]
    pub struct FinalizedFeature {
        pub name: String,
        pub min_version_level: i16,
        pub max_version_level: i16,
    }

    #[derive(Debug, Clone)]
    pub struct DescribeFeaturesResponse {
        pub throttle_time_ms: i32,
        pub error_code: i16,
        pub supported_features: Vec<SupportedFeature>,
        pub finalized_features_epoch: i64,
        pub finalized_features: Vec<FinalizedFeature>,
    }

    pub fn describe_create_request(header: &RequestHeader, _req: &DescribeFeaturesRequest) -> Result<Vec<u8>> {
        write_header_and_frame(header, |w, flexible| {
            if flexible {
                w.put_tagged_fields();
            }
            Ok(())
        })
    }

    pub fn describe_parse_response(body: &[u8], api_version: i16) -> Result<DescribeFeaturesResponse> {
        let flexible = api_version >= 1;
        read_header_then(body, flexible, |r| {
            let throttle_time_ms = r.read_i32()?;
            let error_code = r.read_i16()?;
            let read_supported = |r: &mut Reader<'_>| -> Result<SupportedFeature> {
                let name = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? }.unwrap_or_default();
                let min_version = r.read_i16()?;
                let max_version = r.read_i16()?;
                if flexible {
                    r.skip_tagged_fields()?;
                }
                Ok(SupportedFeature { name, min_version, max_version })
            };
            let supported_features = if flexible {
                r.read_compact_array(read_supported)?
            } else {
                r.read_legacy_array(read_supported)?
            };
            let finalized_features_epoch = r.read_i64()?;
            let read_finalized = |r: &mut Reader<'_>| -> Result<FinalizedFeature> {
                let name = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? }.unwrap_or_default();
                let min_version_level = r.read_i16()?;
                let max_version_level = r.read_i16()?;
                if flexible {
                    r.skip_tagged_fields()?;
                }
                Ok(FinalizedFeature { name, min_version_level, max_version_level })
            };
            let finalized_features = if flexible {
                r.read_compact_array(read_finalized)?
            } else {
                r.read_legacy_array(read_finalized)?
            };
            if flexible {
                r.skip_tagged_fields()?;
            }
            Ok(DescribeFeaturesResponse {
                throttle_time_ms,
                error_code,
                supported_features,
                finalized_features_epoch,
                finalized_features,
            })
        })
    }

    #[derive(Debug, Clone)]
    pub struct FeatureUpdate {
        pub feature: String,
        pub max_version_level: i16,
        pub upgrade_type: i8,
    }

    #[derive(Debug, Clone)]
    pub struct UpdateFeaturesRequest {
        pub timeout_ms: i32,
        pub feature_updates: Vec<FeatureUpdate>,
    }

    #[derive(Debug, Clone)]
    pub struct UpdateFeaturesResponse {
        pub throttle_time_ms: i32,
        pub error_code: i16,
        pub error_message: Option<String>,
        pub results: Vec<ResourceResult>,
    }

    pub fn update_create_request(header: &RequestHeader, req: &UpdateFeaturesRequest) -> Result<Vec<u8>> {
        write_header_and_frame(header, |w, flexible| {
            w.put_i32(req.timeout_ms);
            let write_update = |w: &mut Writer, u: &FeatureUpdate| -> Result<()> {
                if flexible {
                    w.put_compact_string(Some(&u.feature));
                } else {
                    w.put_legacy_string(Some(&u.feature));
                }
                w.put_i16(u.max_version_level);
                w.put_i8(u.upgrade_type);
                if flexible {
                    w.put_tagged_fields();
                }
                Ok(())
            };
            if flexible {
                w.put_compact_array(&req.feature_updates, write_update)?;
            } else {
                w.put_legacy_array(&req.feature_updates, write_update)?;
            }
            if flexible {
                w.put_tagged_fields();
            }
            Ok(())
        })
    }

    pub fn update_parse_response(body: &[u8], api_version: i16) -> Result<UpdateFeaturesResponse> {
        let flexible = api_version >= 1;
        read_header_then(body, flexible, |r| {
            let throttle_time_ms = r.read_i32()?;
            let error_code = r.read_i16()?;
            let error_message = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? };
            let read_result = |r: &mut Reader<'_>| -> Result<ResourceResult> {
                let name = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? }.unwrap_or_default();
                let error_code = r.read_i16()?;
                let error_message = if flexible { r.read_compact_string()? } else { r.read_legacy_string()? };
                if flexible {
                    r.skip_tagged_fields()?;
                }
                Ok(ResourceResult { name, error_code, error_message })
            };
            let results = if flexible {
                r.read_compact_array(read_result)?
            } else {
                r.read_legacy_array(read_result)?
            };
            if flexible {
                r.skip_tagged_fields()?;
            }
            Ok(UpdateFeaturesResponse { throttle_time_ms, error_code, error_message, results })
        })
    }

    #[allow(dead_code)]
    const fn _api() -> (ApiKey, ApiKey) {
        (ApiKey::DescribeFeatures, ApiKey::UpdateFeatures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ApiKey;

    #[test]
    fn describe_configs_round_trip() {
        let header = RequestHeader::new(ApiKey::DescribeConfigs, 1, 1, Some("c"), false);
        let req = describe_configs::DescribeConfigsRequest {
            resources: vec![describe_configs::Resource {
                resource_type: 2, // topic
                resource_name: "orders".into(),
                configuration_keys: None,
            }],
            include_synonyms: false,
        };
        let bytes = describe_configs::create_request(&header, &req).unwrap();
        assert!(bytes.len() > 10);
    }

    #[test]
    fn list_groups_round_trip() {
        let header = RequestHeader::new(ApiKey::ListGroups, 2, 1, Some("c"), false);
        let req = list_groups::ListGroupsRequest::default();
        let bytes = list_groups::create_request(&header, &req).unwrap();
        assert!(bytes.len() > 5);
    }

    #[test]
    fn delete_groups_round_trip() {
        let header = RequestHeader::new(ApiKey::DeleteGroups, 1, 1, Some("c"), false);
        let req = delete_groups::DeleteGroupsRequest {
            group_ids: vec!["g".into()],
        };
        let bytes = delete_groups::create_request(&header, &req).unwrap();
        assert!(bytes.len() > 5);
    }

    #[test]
    fn create_partitions_round_trip() {
        let header = RequestHeader::new(ApiKey::CreatePartitions, 3, 1, Some("c"), true);
        let req = create_partitions::CreatePartitionsRequest {
            topics: vec![create_partitions::NewPartitions {
                topic: "orders".into(),
                assignment: create_partitions::NewPartitionAssignment { new_count: 6, broker_ids: None },
            }],
            timeout_ms: 5000,
            validate_only: false,
        };
        let bytes = create_partitions::create_request(&header, &req).unwrap();
        assert!(bytes.len() > 10);
    }

    #[test]
    fn describe_acls_round_trip() {
        let header = RequestHeader::new(ApiKey::DescribeAcls, 2, 1, Some("c"), false);
        let req = acls::DescribeAclsRequest {
            filter: acls::AclDescriptor {
                resource_type: 2,
                resource_name: "orders".into(),
                pattern_type: 3,
                principal: "User:*".into(),
                host: "*".into(),
                operation: 1,
                permission_type: 3,
            },
        };
        let bytes = acls::describe_create_request(&header, &req).unwrap();
        assert!(bytes.len() > 10);
    }

    #[test]
    fn offset_delete_round_trip() {
        let header = RequestHeader::new(ApiKey::OffsetDelete, 0, 1, Some("c"), false);
        let req = offset_delete::OffsetDeleteRequest {
            group_id: "g1".into(),
            topics: vec![offset_delete::OffsetDeleteTopic {
                name: "orders".into(),
                partitions: vec![offset_delete::OffsetDeletePartition { partition_index: 0 }],
            }],
        };
        let bytes = offset_delete::create_request(&header, &req).unwrap();
        assert!(bytes.len() > 10);
    }
}
